//! Application assembly
//!
//! An [`App`] bundles everything the dispatcher reads per request: the route
//! table, CORS policy, optional static root and the flow engine. It is built
//! once, before the listener accepts connections, and shared read-only
//! through an `Arc`.

use crate::config::Config;
use crate::engine::FlowEngine;
use crate::error::Error;
use crate::handler::StaticFiles;
use crate::http::CorsPolicy;
use crate::logger;
use crate::routing::{RouteSource, RouteTable, TriggerDirectory};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

/// Default request body limit for the body parsers (10 MiB)
pub const DEFAULT_MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;

pub struct App {
    routes: RouteTable,
    cors: CorsPolicy,
    statics: Option<StaticFiles>,
    engine: Arc<dyn FlowEngine>,
    shared: Option<Arc<dyn Any + Send + Sync>>,
    request_timeout: Option<Duration>,
    max_body_size: u64,
}

impl App {
    pub fn builder(engine: impl FlowEngine) -> AppBuilder {
        AppBuilder::new(Arc::new(engine))
    }

    /// Wire an app from configuration: config route entries first, then the
    /// trigger directory
    pub fn from_config(config: &Config, engine: Arc<dyn FlowEngine>) -> Result<Self, Error> {
        let mut builder = AppBuilder::new(engine)
            .fallback_handler(&config.routes.not_found_handler)
            .cors(CorsPolicy::from_config(&config.cors)?)
            .max_body_size(config.http.max_body_size)
            .request_timeout(config.performance.request_timeout.map(Duration::from_secs))
            .reserved_prefix(config.static_files.reserved_prefix.as_deref());

        if let Some(root) = &config.static_files.root {
            builder = builder.static_root(root);
        }

        builder = builder.routes(&config.routes.entries)?;

        if let Some(dir) = &config.routes.triggers_dir {
            let source = TriggerDirectory::new(dir, &config.routes.api_prefix);
            builder = builder.routes(&source)?;
        }

        Ok(builder.build())
    }

    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub const fn cors(&self) -> &CorsPolicy {
        &self.cors
    }

    pub const fn statics(&self) -> Option<&StaticFiles> {
        self.statics.as_ref()
    }

    pub fn engine(&self) -> &dyn FlowEngine {
        self.engine.as_ref()
    }

    pub fn shared(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.shared.clone()
    }

    pub const fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub const fn max_body_size(&self) -> u64 {
        self.max_body_size
    }
}

pub struct AppBuilder {
    routes: RouteTable,
    cors: CorsPolicy,
    static_root: Option<String>,
    reserved_prefix: Option<String>,
    engine: Arc<dyn FlowEngine>,
    shared: Option<Arc<dyn Any + Send + Sync>>,
    request_timeout: Option<Duration>,
    max_body_size: u64,
}

impl AppBuilder {
    fn new(engine: Arc<dyn FlowEngine>) -> Self {
        Self {
            routes: RouteTable::new(),
            cors: CorsPolicy::default(),
            static_root: None,
            reserved_prefix: None,
            engine,
            shared: None,
            request_timeout: None,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Register one route
    pub fn route(mut self, method: &str, path: &str, handler: &str) -> Result<Self, Error> {
        self.routes.register(method, path, handler)?;
        logger::log_route_registered(method, path, handler);
        Ok(self)
    }

    /// Register every route a source yields, in order
    pub fn routes<S: RouteSource + ?Sized>(mut self, source: &S) -> Result<Self, Error> {
        for spec in source.routes()? {
            self = self.route(&spec.method, &spec.path, &spec.handler)?;
        }
        Ok(self)
    }

    /// Handler id for unmatched non-GET requests
    #[must_use]
    pub fn fallback_handler(mut self, handler: &str) -> Self {
        self.routes = self.routes.with_fallback(handler);
        self
    }

    #[must_use]
    pub fn static_root(mut self, root: &str) -> Self {
        self.static_root = Some(root.to_string());
        self
    }

    /// Paths under this prefix skip the static phase
    #[must_use]
    pub fn reserved_prefix(mut self, prefix: Option<&str>) -> Self {
        self.reserved_prefix = prefix.map(ToString::to_string);
        self
    }

    #[must_use]
    pub fn cors(mut self, policy: CorsPolicy) -> Self {
        self.cors = policy;
        self
    }

    /// Value handed to every flow through `FlowContext::shared`
    #[must_use]
    pub fn shared<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.shared = Some(Arc::new(value));
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn max_body_size(mut self, limit: u64) -> Self {
        self.max_body_size = limit;
        self
    }

    pub fn build(self) -> App {
        let statics = self.static_root.map(|root| {
            StaticFiles::new(root).with_reserved_prefix(self.reserved_prefix.as_deref())
        });
        App {
            routes: self.routes,
            cors: self.cors,
            statics,
            engine: self.engine,
            shared: self.shared,
            request_timeout: self.request_timeout,
            max_body_size: self.max_body_size,
        }
    }
}
