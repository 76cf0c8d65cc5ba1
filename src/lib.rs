//! HTTP trigger
//!
//! A small front controller: CORS negotiation, static files with traversal
//! protection, and method + path-pattern routing in front of a pluggable
//! [`FlowEngine`] whose results are shaped into HTTP responses.

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod routing;
pub mod server;

pub use app::{App, AppBuilder};
pub use config::Config;
pub use engine::{
    DispatchResult, EchoEngine, FlowContext, FlowEngine, FlowError, FlowInput, ResponsePayload,
};
pub use error::{Error, RouteError};
pub use handler::handle_request;
pub use routing::{RouteSource, RouteSpec, RouteTable, TriggerDirectory};
