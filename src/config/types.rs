// Configuration types module
// Defines all configuration-related data structures

use crate::routing::{RouteSpec, DEFAULT_FALLBACK_HANDLER};
use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default, rename = "static")]
    pub static_files: StaticConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// One of `error`, `warn`, `info`, `debug`
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
    /// Deadline in seconds for a single flow execution
    #[serde(default)]
    pub request_timeout: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Upper bound for request bodies read by the body parsers
    pub max_body_size: u64,
}

/// `cors.origin` accepts `true`, `false`, a list of origins, or a literal
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum OriginSetting {
    Flag(bool),
    List(Vec<String>),
    Literal(String),
}

/// CORS policy settings; missing fields take the defaults below
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CorsConfig {
    pub origin: OriginSetting,
    pub methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub credentials: bool,
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origin: OriginSetting::Literal("*".to_string()),
            methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS", "PATCH"]
                .map(String::from)
                .to_vec(),
            allowed_headers: ["Content-Type", "Authorization", "X-Requested-With"]
                .map(String::from)
                .to_vec(),
            credentials: false,
            max_age: Some(86_400),
        }
    }
}

/// Static file serving
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StaticConfig {
    /// Directory to serve; static serving is off when unset
    pub root: Option<String>,
    /// Paths under this prefix always go to routing
    pub reserved_prefix: Option<String>,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            root: None,
            reserved_prefix: Some(default_api_prefix()),
        }
    }
}

/// Route registration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RoutesConfig {
    /// Handler id for unmatched non-GET requests
    pub not_found_handler: String,
    /// Prefix for routes discovered from trigger manifests
    pub api_prefix: String,
    /// Directory of trigger manifests
    pub triggers_dir: Option<String>,
    /// Explicit routes, registered before discovered ones
    pub entries: Vec<RouteSpec>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            not_found_handler: DEFAULT_FALLBACK_HANDLER.to_string(),
            api_prefix: default_api_prefix(),
            triggers_dir: None,
            entries: Vec::new(),
        }
    }
}

fn default_api_prefix() -> String {
    "/api".to_string()
}
