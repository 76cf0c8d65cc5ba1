//! Request dispatch
//!
//! Runs every request through the fixed phase order:
//! CORS, static files, route lookup, SPA fallback or reserved handler,
//! engine delegation, response shaping.

use super::shape::shape_result;
use super::static_files::StaticOutcome;
use crate::app::App;
use crate::engine::{
    DispatchResult, FlowContext, FlowError, FlowInput, RequestHandle, ResponseHandle,
};
use crate::http::{self, cors, BoxError, CorsOutcome, RequestBody, ResponseBody};
use crate::logger;
use futures_util::FutureExt;
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};
use hyper::header::ORIGIN;
use hyper::{HeaderMap, Method, Request, Response};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

const SPA_INDEX: &str = "/index.html";

/// Handle one request end to end
pub async fn handle_request<B>(
    req: Request<B>,
    app: Arc<App>,
    peer: Option<SocketAddr>,
) -> Response<ResponseBody>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let origin = req.headers().get(ORIGIN).cloned();
    let cors_headers = match app.cors().negotiate(req.method(), origin.as_ref()) {
        CorsOutcome::Preflight(resp) => return resp,
        CorsOutcome::Continue(headers) => headers,
    };

    let mut resp = route(req, &app, peer).await;
    cors::apply_headers(&mut resp, &cors_headers);
    resp
}

async fn route<B>(req: Request<B>, app: &App, peer: Option<SocketAddr>) -> Response<ResponseBody>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let path = req.uri().path().to_string();

    if let Some(statics) = app.statics() {
        if statics.applies(req.method(), &path) {
            if let Some(resp) = statics.serve(&path).await.into_response() {
                return resp;
            }
        }
    }

    let (handler, params) = match app.routes().resolve(req.method(), &path) {
        Some(m) => (m.handler.to_string(), m.params),
        None if req.method() == Method::GET => return spa_fallback(app, &path).await,
        None => {
            logger::log_debug(&format!(
                "No route for {} {path}, using '{}'",
                req.method(),
                app.routes().fallback_handler()
            ));
            (app.routes().fallback_handler().to_string(), BTreeMap::new())
        }
    };

    let input = FlowInput {
        params,
        query: parse_query(req.uri().query()),
        headers: collect_headers(req.headers()),
    };
    logger::log_debug(&format!("{} {path} -> '{handler}'", req.method()));

    let (parts, body) = req.into_parts();
    let body: RequestBody = body.map_err(Into::into).boxed_unsync();
    let response = ResponseHandle::new();
    let ctx = FlowContext {
        shared: app.shared(),
        request: RequestHandle::new(parts.method, parts.uri, parts.headers, body, app.max_body_size())
            .with_peer(peer),
        response: response.clone(),
    };

    let result = delegate(app, &handler, input, ctx)
        .await
        .unwrap_or_else(|err| {
            logger::log_warning(&format!("Flow '{handler}' failed: {err}"));
            err.into_result()
        });
    shape_result(result, &response)
}

/// Unmatched GET: serve the root index, else 404
async fn spa_fallback(app: &App, path: &str) -> Response<ResponseBody> {
    logger::log_debug(&format!("No route for GET {path}, trying {SPA_INDEX}"));
    let outcome = match app.statics() {
        Some(statics) => statics.serve(SPA_INDEX).await,
        None => StaticOutcome::NotHandled,
    };
    outcome
        .into_response()
        .unwrap_or_else(http::build_404_response)
}

/// Run the engine, containing panics and the optional deadline
async fn delegate(
    app: &App,
    handler: &str,
    input: FlowInput,
    ctx: FlowContext,
) -> Result<DispatchResult, FlowError> {
    let engine = app.engine();
    let Ok(future) = std::panic::catch_unwind(AssertUnwindSafe(|| {
        engine.execute(handler, input, ctx)
    })) else {
        logger::log_error(&format!("Flow '{handler}' panicked"));
        return Err(FlowError::default());
    };

    let guarded = AssertUnwindSafe(future).catch_unwind();
    let outcome = match app.request_timeout() {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(outcome) => outcome,
            Err(_) => {
                logger::log_warning(&format!(
                    "Flow '{handler}' exceeded {}s deadline",
                    limit.as_secs_f64()
                ));
                return Err(FlowError::new(504, "Gateway timeout"));
            }
        },
        None => guarded.await,
    };

    outcome.unwrap_or_else(|_| {
        logger::log_error(&format!("Flow '{handler}' panicked"));
        Err(FlowError::default())
    })
}

/// Decoded query pairs; a repeated key keeps its last value
fn parse_query(query: Option<&str>) -> BTreeMap<String, String> {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Header names are already lower case; repeated headers are joined
fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        out.entry(name.as_str().to_string())
            .and_modify(|joined| {
                joined.push_str(", ");
                joined.push_str(&value);
            })
            .or_insert_with(|| value.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn test_parse_query_last_wins() {
        let q = parse_query(Some("a=1&b=two%20words&a=3&flag"));
        assert_eq!(q["a"], "3");
        assert_eq!(q["b"], "two words");
        assert_eq!(q["flag"], "");
        assert!(parse_query(None).is_empty());
    }

    #[test]
    fn test_collect_headers_joins_repeats() {
        let mut headers = HeaderMap::new();
        headers.append("x-tag", HeaderValue::from_static("a"));
        headers.append("x-tag", HeaderValue::from_static("b"));
        headers.insert("accept", HeaderValue::from_static("*/*"));
        let out = collect_headers(&headers);
        assert_eq!(out["x-tag"], "a, b");
        assert_eq!(out["accept"], "*/*");
    }
}
