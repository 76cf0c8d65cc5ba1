//! Crate-wide error types
//!
//! Request-level failures never surface as `Error`: the dispatcher turns them
//! into HTTP responses. These types cover startup (configuration, route
//! registration, binding) and the accept loop.

use std::path::PathBuf;
use thiserror::Error;

/// Infrastructure error returned by fallible startup and server operations
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("invalid address: {0}")]
    Addr(String),

    #[error("invalid CORS setting `{field}`: {value}")]
    Cors { field: &'static str, value: String },
}

/// Rejected route registration
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid HTTP method `{0}`")]
    InvalidMethod(String),

    #[error("duplicate placeholder `:{name}` in route `{pattern}`")]
    DuplicatePlaceholder { pattern: String, name: String },

    #[error("failed to read trigger manifest {path}: {source}")]
    ManifestIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid trigger manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        source: toml::de::Error,
    },
}
