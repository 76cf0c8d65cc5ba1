// Configuration module entry point
// Loads the layered configuration once at startup; nothing mutates it afterwards

mod types;

use crate::error::Error;
use std::net::SocketAddr;

pub use types::{
    Config, CorsConfig, HttpConfig, LoggingConfig, OriginSetting, PerformanceConfig,
    RoutesConfig, ServerConfig, StaticConfig,
};

/// Environment variables override the file, e.g. `HTTP_TRIGGER_SERVER__PORT=9000`
const ENV_PREFIX: &str = "HTTP_TRIGGER";

impl Config {
    /// Load configuration from specified file path (extension optional)
    ///
    /// A missing file is fine; every field has a default.
    pub fn load_from(config_path: &str) -> Result<Self, Error> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, Error> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| Error::Addr(format!("{}:{}: {e}", self.server.host, self.server.port)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("/nonexistent/http-trigger-config").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.http.max_body_size, 10_485_760);
        assert_eq!(cfg.cors.origin, OriginSetting::Literal("*".into()));
        assert_eq!(cfg.cors.max_age, Some(86_400));
        assert_eq!(cfg.static_files.root, None);
        assert_eq!(cfg.static_files.reserved_prefix.as_deref(), Some("/api"));
        assert_eq!(cfg.routes.not_found_handler, "not-found");
        assert!(cfg.performance.request_timeout.is_none());
        assert!(cfg.get_socket_addr().is_ok());
    }

    #[test]
    fn test_file_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9100

[performance]
request_timeout = 5

[cors]
origin = ["https://x.test"]
credentials = true

[static]
root = "public"

[routes]
not_found_handler = "missing"

[[routes.entries]]
method = "POST"
path = "/api/users/:id"
handler = "users/update"

[[routes.entries]]
path = "/api/health"
handler = "health"
"#
        )
        .unwrap();

        let cfg = Config::load_from(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.performance.request_timeout, Some(5));
        assert_eq!(
            cfg.cors.origin,
            OriginSetting::List(vec!["https://x.test".into()])
        );
        assert!(cfg.cors.credentials);
        assert_eq!(cfg.cors.methods.len(), 6);
        assert_eq!(cfg.static_files.root.as_deref(), Some("public"));
        assert_eq!(cfg.routes.not_found_handler, "missing");
        assert_eq!(cfg.routes.entries.len(), 2);
        assert_eq!(cfg.routes.entries[0].method, "POST");
        assert_eq!(cfg.routes.entries[1].method, "GET");
    }

    #[test]
    fn test_bad_address() {
        let mut cfg = Config::load_from("/nonexistent/http-trigger-config").unwrap();
        cfg.server.host = "not a host".into();
        assert!(matches!(cfg.get_socket_addr(), Err(Error::Addr(_))));
    }
}
