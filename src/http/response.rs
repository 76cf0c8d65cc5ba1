//! HTTP response building module
//!
//! Builders for the fixed responses this layer writes itself. Engine results
//! are shaped in `handler::shape`.

use super::body::{self, ResponseBody};
use hyper::header::{CONTENT_TYPE, LOCATION};
use hyper::{Response, StatusCode};

/// 403 for paths that escape the static root
pub fn build_403_response() -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::FORBIDDEN)
        .header(CONTENT_TYPE, "text/plain")
        .body(body::full("Forbidden"))
        .unwrap_or_else(|e| {
            log_build_error("403", &e);
            Response::new(body::full("Forbidden"))
        })
}

/// 404 when neither a route nor the static index answers a GET
pub fn build_404_response() -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(CONTENT_TYPE, "text/plain")
        .body(body::full("Not Found"))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(body::full("Not Found"))
        })
}

/// 302 with an empty body
pub fn build_redirect_response(target: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(LOCATION, target)
        .body(body::empty())
        .unwrap_or_else(|e| {
            log_build_error("302", &e);
            internal_error()
        })
}

/// 200 with a streamed static file
pub fn build_file_response(file: tokio::fs::File, content_type: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .body(body::file(file))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            internal_error()
        })
}

/// Bare 500 used when a response cannot be assembled
pub fn internal_error() -> Response<ResponseBody> {
    let mut resp = Response::new(body::empty());
    *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    resp
}

fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_403_body() {
        let resp = build_403_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(resp.headers()[CONTENT_TYPE], "text/plain");
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"Forbidden");
    }

    #[tokio::test]
    async fn test_redirect_has_empty_body() {
        let resp = build_redirect_response("/login");
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers()[LOCATION], "/login");
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_invalid_redirect_target_falls_back_to_500() {
        let resp = build_redirect_response("bad\ntarget");
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
