//! Request handler module
//!
//! Per-request pipeline: dispatch, static files, result shaping, plus the
//! body parsers flows use to read request payloads.

pub mod body;
mod dispatch;
mod shape;
pub mod static_files;

pub use body::{parse_extended_form, with_form_body, with_json_body, BodyError};
pub use dispatch::handle_request;
pub use shape::shape_result;
pub use static_files::{StaticFiles, StaticOutcome};
