//! Route table
//!
//! A flat, insertion-ordered list of `(method, pattern) -> handler id` entries.
//! Lookup first tries the request path as a literal key, then scans the
//! entries in registration order. A miss on the literal key costs one pass
//! over the entries, which is fine at the route counts this serves.

use super::pattern::Pattern;
use crate::error::RouteError;
use hyper::Method;
use std::collections::{BTreeMap, HashMap};

/// Handler id used when nothing matches and the request cannot fall back to
/// the static index
pub const DEFAULT_FALLBACK_HANDLER: &str = "not-found";

#[derive(Debug, Clone)]
struct RouteEntry {
    method: Method,
    pattern: Pattern,
    handler: String,
}

/// Result of a successful lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub handler: &'a str,
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    index: HashMap<(Method, String), usize>,
    fallback: String,
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            fallback: DEFAULT_FALLBACK_HANDLER.to_string(),
        }
    }

    /// Replace the reserved handler id used for unmatched non-GET requests
    #[must_use]
    pub fn with_fallback(mut self, handler: impl Into<String>) -> Self {
        self.fallback = handler.into();
        self
    }

    pub fn fallback_handler(&self) -> &str {
        &self.fallback
    }

    /// Register a route. Method names are upper-cased; registering the same
    /// method and pattern again replaces the handler but keeps the original
    /// position in the scan order.
    pub fn register(
        &mut self,
        method: &str,
        pattern: &str,
        handler: impl Into<String>,
    ) -> Result<(), RouteError> {
        let method = parse_method(method)?;
        let compiled = Pattern::compile(pattern)?;
        let handler = handler.into();

        let key = (method.clone(), pattern.to_string());
        if let Some(&pos) = self.index.get(&key) {
            self.entries[pos].handler = handler;
            return Ok(());
        }

        self.index.insert(key, self.entries.len());
        self.entries.push(RouteEntry {
            method,
            pattern: compiled,
            handler,
        });
        Ok(())
    }

    /// Resolve a request to a handler id and its path parameters
    pub fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        // Literal key first; no pattern work for plain routes
        if let Some(&pos) = self.index.get(&(method.clone(), path.to_string())) {
            return Some(RouteMatch {
                handler: &self.entries[pos].handler,
                params: BTreeMap::new(),
            });
        }

        self.entries
            .iter()
            .filter(|entry| entry.method == *method)
            .find_map(|entry| {
                entry.pattern.extract(path).map(|params| RouteMatch {
                    handler: &entry.handler,
                    params,
                })
            })
    }

    /// Registered routes as `(method, pattern, handler)` in scan order
    pub fn iter(&self) -> impl Iterator<Item = (&Method, &str, &str)> {
        self.entries
            .iter()
            .map(|e| (&e.method, e.pattern.as_str(), e.handler.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_method(method: &str) -> Result<Method, RouteError> {
    let upper = method.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return Err(RouteError::InvalidMethod(method.to_string()));
    }
    Method::from_bytes(upper.as_bytes()).map_err(|_| RouteError::InvalidMethod(method.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(routes: &[(&str, &str, &str)]) -> RouteTable {
        let mut t = RouteTable::new();
        for (m, p, h) in routes {
            t.register(m, p, *h).unwrap();
        }
        t
    }

    #[test]
    fn test_literal_beats_pattern() {
        let t = table(&[("GET", "/:x", "param"), ("GET", "/a", "literal")]);
        let m = t.resolve(&Method::GET, "/a").unwrap();
        assert_eq!(m.handler, "literal");
        assert!(m.params.is_empty());

        let m = t.resolve(&Method::GET, "/b").unwrap();
        assert_eq!(m.handler, "param");
        assert_eq!(m.params["x"], "b");
    }

    #[test]
    fn test_first_registered_pattern_wins() {
        let t = table(&[
            ("GET", "/users/:id", "by-id"),
            ("GET", "/users/:name", "by-name"),
        ]);
        let m = t.resolve(&Method::GET, "/users/7").unwrap();
        assert_eq!(m.handler, "by-id");
        assert_eq!(m.params["id"], "7");
    }

    #[test]
    fn test_method_must_match() {
        let t = table(&[("POST", "/items/:id", "update")]);
        assert!(t.resolve(&Method::GET, "/items/1").is_none());
        assert_eq!(t.resolve(&Method::POST, "/items/1").unwrap().handler, "update");
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let t = table(&[
            ("GET", "/:a", "first"),
            ("GET", "/:b", "second"),
            ("GET", "/:a", "replaced"),
        ]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.resolve(&Method::GET, "/z").unwrap().handler, "replaced");
    }

    #[test]
    fn test_lowercase_method_normalized() {
        let t = table(&[("post", "/login", "login")]);
        assert_eq!(t.resolve(&Method::POST, "/login").unwrap().handler, "login");
    }

    #[test]
    fn test_invalid_method_rejected() {
        let mut t = RouteTable::new();
        assert!(matches!(
            t.register("GE T", "/", "x"),
            Err(RouteError::InvalidMethod(_))
        ));
        assert!(matches!(
            t.register("", "/", "x"),
            Err(RouteError::InvalidMethod(_))
        ));
    }

    #[test]
    fn test_no_match_and_fallback() {
        let t = table(&[("GET", "/a", "a")]).with_fallback("missing");
        assert!(t.resolve(&Method::GET, "/b").is_none());
        assert_eq!(t.fallback_handler(), "missing");
        assert_eq!(RouteTable::new().fallback_handler(), DEFAULT_FALLBACK_HANDLER);
    }
}
