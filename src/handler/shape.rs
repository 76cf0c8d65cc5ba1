// Turns a flow's DispatchResult into the HTTP response

use crate::engine::{DispatchResult, ResponseHandle, ResponsePayload};
use crate::http::{self, body, response::internal_error, ResponseBody};
use crate::logger;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use std::collections::BTreeMap;

/// Shape a result; `sent` is the response handle the flow was given
pub fn shape_result(result: DispatchResult, sent: &ResponseHandle) -> Response<ResponseBody> {
    let written = sent.take();
    if result.http_sent {
        return written.unwrap_or_else(|| {
            logger::log_warning("Flow reported httpSent without writing a response");
            Response::new(body::empty())
        });
    }
    if let Some(resp) = written {
        logger::log_warning("Flow wrote a response without setting httpSent; using it");
        return resp;
    }

    let status = status_code(result.status);

    if let Some(ResponsePayload::Binary(bytes)) = result.response {
        let mut resp = Response::new(body::full(bytes));
        *resp.status_mut() = status;
        apply_custom_headers(&mut resp, result.headers.as_ref());
        return resp;
    }

    if let Some(target) = result.redirect.filter(|t| !t.is_empty()) {
        return http::build_redirect_response(&target);
    }

    let payload = match result.response {
        Some(ResponsePayload::Json(value)) => match serde_json::to_vec(&value) {
            Ok(bytes) => body::full(bytes),
            Err(e) => {
                logger::log_error(&format!("Failed to serialize flow response: {e}"));
                return internal_error();
            }
        },
        _ => body::empty(),
    };

    let mut resp = Response::new(payload);
    *resp.status_mut() = status;
    apply_custom_headers(&mut resp, result.headers.as_ref());
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}

fn status_code(status: Option<u16>) -> StatusCode {
    // 0 means unset, like a missing status
    let Some(code) = status.filter(|&c| c != 0) else {
        return StatusCode::OK;
    };
    StatusCode::from_u16(code).unwrap_or_else(|_| {
        logger::log_warning(&format!("Flow returned invalid status {code}"));
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

fn apply_custom_headers<B>(resp: &mut Response<B>, headers: Option<&BTreeMap<String, String>>) {
    for (name, value) in headers.into_iter().flatten() {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                resp.headers_mut().insert(name, value);
            }
            _ => logger::log_warning(&format!("Skipping invalid response header '{name}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FlowError;
    use http_body_util::BodyExt;
    use hyper::header::LOCATION;
    use serde_json::json;

    async fn body_bytes(resp: Response<ResponseBody>) -> Vec<u8> {
        resp.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    #[tokio::test]
    async fn test_json_result() {
        let result = DispatchResult::json(json!({"ok": true}))
            .with_status(201)
            .with_header("X-Trace", "abc")
            .with_header("Content-Type", "text/plain");
        let resp = shape_result(result, &ResponseHandle::new());
        assert_eq!(resp.status(), 201);
        assert_eq!(resp.headers()["x-trace"], "abc");
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body_bytes(resp).await, br#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_flow_error_is_json_string() {
        let resp = shape_result(FlowError::new(404, "nope").into_result(), &ResponseHandle::new());
        assert_eq!(resp.status(), 404);
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body_bytes(resp).await, br#""nope""#);
    }

    #[tokio::test]
    async fn test_binary_is_raw() {
        let result: DispatchResult = serde_json::from_value(json!({
            "response": {"type": "Buffer", "data": [0, 159, 146, 150]}
        }))
        .unwrap();
        let resp = shape_result(result, &ResponseHandle::new());
        assert_eq!(resp.status(), 200);
        assert!(resp.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(body_bytes(resp).await, [0, 159, 146, 150]);
    }

    #[tokio::test]
    async fn test_binary_takes_precedence_over_redirect() {
        let mut result = DispatchResult::binary(&b"raw"[..]);
        result.redirect = Some("/elsewhere".into());
        let resp = shape_result(result, &ResponseHandle::new());
        assert!(resp.headers().get(LOCATION).is_none());
        assert_eq!(body_bytes(resp).await, b"raw");
    }

    #[tokio::test]
    async fn test_redirect() {
        let resp = shape_result(DispatchResult::redirect("/login"), &ResponseHandle::new());
        assert_eq!(resp.status(), 302);
        assert_eq!(resp.headers()[LOCATION], "/login");
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_http_sent_uses_written_response() {
        let handle = ResponseHandle::new();
        let mut written = Response::new(body::full("direct"));
        *written.status_mut() = StatusCode::ACCEPTED;
        handle.send(written).unwrap();

        let resp = shape_result(DispatchResult::sent(), &handle);
        assert_eq!(resp.status(), 202);
        assert_eq!(body_bytes(resp).await, b"direct");
    }

    #[tokio::test]
    async fn test_http_sent_without_response() {
        let resp = shape_result(DispatchResult::sent(), &ResponseHandle::new());
        assert_eq!(resp.status(), 200);
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_response_is_empty_json() {
        let resp = shape_result(DispatchResult::default(), &ResponseHandle::new());
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_unset_values_fall_through() {
        let result: DispatchResult = serde_json::from_value(json!({
            "status": 0,
            "redirect": "",
            "response": null
        }))
        .unwrap();
        let resp = shape_result(result, &ResponseHandle::new());
        assert_eq!(resp.status(), 200);
        assert!(resp.headers().get(LOCATION).is_none());
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body_bytes(resp).await, b"null");
    }

    #[test]
    fn test_invalid_status_and_headers() {
        let result = DispatchResult::json(json!(1))
            .with_status(1000)
            .with_header("bad header", "x");
        let resp = shape_result(result, &ResponseHandle::new());
        assert_eq!(resp.status(), 500);
        assert_eq!(resp.headers().len(), 1);
    }
}
