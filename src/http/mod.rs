//! HTTP protocol layer module
//!
//! Body types, MIME detection, CORS negotiation and fixed response builders,
//! independent of routing and of the flow engine.

pub mod body;
pub mod cors;
pub mod mime;
pub mod response;

pub use body::{BoxError, RequestBody, ResponseBody};
pub use cors::{CorsOutcome, CorsPolicy, OriginRule};
pub use response::{
    build_403_response, build_404_response, build_file_response, build_redirect_response,
};
