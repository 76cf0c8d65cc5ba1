//! CORS negotiation
//!
//! The policy is fixed at startup. Every request gets the derived
//! `Access-Control-*` headers; `OPTIONS` requests are answered right here with
//! `204 No Content` and never reach routing.

use super::body::{self, ResponseBody};
use crate::config::{CorsConfig, OriginSetting};
use crate::error::Error;
use hyper::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, VARY,
};
use hyper::{Method, Response, StatusCode};

/// How `Access-Control-Allow-Origin` is derived
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginRule {
    /// Echo the request's Origin, `*` when it has none
    Mirror,
    /// Never send the header
    Deny,
    /// Echo the Origin only when it is listed
    AllowList(Vec<String>),
    /// Always send this value
    Literal(HeaderValue),
}

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origin: OriginRule,
    methods: Option<HeaderValue>,
    allowed_headers: Option<HeaderValue>,
    credentials: bool,
    max_age: Option<u64>,
}

/// Result of the CORS phase
pub enum CorsOutcome {
    /// Preflight answered; nothing else runs for this request
    Preflight(Response<ResponseBody>),
    /// Headers to attach to whatever response the request ends up with
    Continue(HeaderMap),
}

impl CorsPolicy {
    pub fn from_config(cfg: &CorsConfig) -> Result<Self, Error> {
        let origin = match &cfg.origin {
            // Environment overrides arrive as strings
            OriginSetting::Flag(true) => OriginRule::Mirror,
            OriginSetting::Literal(value) if value.eq_ignore_ascii_case("true") => {
                OriginRule::Mirror
            }
            OriginSetting::Flag(false) => OriginRule::Deny,
            OriginSetting::Literal(value) if value.eq_ignore_ascii_case("false") => {
                OriginRule::Deny
            }
            OriginSetting::List(list) => OriginRule::AllowList(list.clone()),
            OriginSetting::Literal(value) => {
                OriginRule::Literal(header_value("origin", value)?)
            }
        };

        Ok(Self {
            origin,
            methods: joined("methods", &cfg.methods)?,
            allowed_headers: joined("allowed_headers", &cfg.allowed_headers)?,
            credentials: cfg.credentials,
            max_age: cfg.max_age,
        })
    }

    pub const fn origin_rule(&self) -> &OriginRule {
        &self.origin
    }

    /// Derive the CORS response headers for a request's `Origin`
    pub fn headers_for(&self, origin: Option<&HeaderValue>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let allow_origin = match &self.origin {
            OriginRule::Mirror => Some(
                origin
                    .cloned()
                    .unwrap_or_else(|| HeaderValue::from_static("*")),
            ),
            OriginRule::Deny => None,
            OriginRule::AllowList(list) => origin
                .filter(|o| o.to_str().is_ok_and(|o| list.iter().any(|a| a == o)))
                .cloned(),
            OriginRule::Literal(value) => Some(value.clone()),
        };
        if let Some(value) = allow_origin {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        // The header depends on the request Origin for these rules
        if matches!(self.origin, OriginRule::Mirror | OriginRule::AllowList(_)) {
            headers.insert(VARY, HeaderValue::from_static("Origin"));
        }

        if let Some(methods) = &self.methods {
            headers.insert(ACCESS_CONTROL_ALLOW_METHODS, methods.clone());
        }
        if let Some(allowed) = &self.allowed_headers {
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, allowed.clone());
        }
        if self.credentials {
            headers.insert(
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        if let Some(max_age) = self.max_age {
            headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(max_age));
        }

        headers
    }

    /// Run the CORS phase for one request
    pub fn negotiate(&self, method: &Method, origin: Option<&HeaderValue>) -> CorsOutcome {
        let headers = self.headers_for(origin);
        if *method != Method::OPTIONS {
            return CorsOutcome::Continue(headers);
        }

        let mut resp = Response::new(body::empty());
        *resp.status_mut() = StatusCode::NO_CONTENT;
        *resp.headers_mut() = headers;
        CorsOutcome::Preflight(resp)
    }
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            origin: OriginRule::Literal(HeaderValue::from_static("*")),
            methods: Some(HeaderValue::from_static(
                "GET, POST, PUT, DELETE, OPTIONS, PATCH",
            )),
            allowed_headers: Some(HeaderValue::from_static(
                "Content-Type, Authorization, X-Requested-With",
            )),
            credentials: false,
            max_age: Some(86_400),
        }
    }
}

/// Copy CORS headers onto a response without replacing headers that are
/// already set
pub fn apply_headers<B>(resp: &mut Response<B>, cors: &HeaderMap) {
    for (name, value) in cors {
        if !resp.headers().contains_key(name) {
            resp.headers_mut().insert(name.clone(), value.clone());
        }
    }
}

fn header_value(field: &'static str, value: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(value).map_err(|_| Error::Cors {
        field,
        value: value.to_string(),
    })
}

fn joined(field: &'static str, items: &[String]) -> Result<Option<HeaderValue>, Error> {
    if items.is_empty() {
        return Ok(None);
    }
    header_value(field, &items.join(", ")).map(Some)
}
