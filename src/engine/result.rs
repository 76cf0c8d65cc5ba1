// Flow outcome types

use hyper::body::Bytes;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Generic description for failures that carry none
pub const INTERNAL_ERROR_DESCRIPTION: &str = "Internal server error";

/// Outcome of a flow, consumed by response shaping
///
/// Deserializes from the camel-cased JSON shape
/// `{ status, response, redirect, headers, httpSent }`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatchResult {
    pub status: Option<u16>,
    /// `None` only when the field is absent; an explicit `null` is kept
    #[serde(deserialize_with = "present_payload")]
    pub response: Option<ResponsePayload>,
    pub redirect: Option<String>,
    pub headers: Option<BTreeMap<String, String>>,
    pub http_sent: bool,
}

fn present_payload<'de, D>(deserializer: D) -> Result<Option<ResponsePayload>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|v| Some(ResponsePayload::from(v)))
}

impl DispatchResult {
    pub fn json(value: impl Into<Value>) -> Self {
        Self {
            response: Some(ResponsePayload::Json(value.into())),
            ..Self::default()
        }
    }

    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self {
            response: Some(ResponsePayload::Binary(data.into())),
            ..Self::default()
        }
    }

    pub fn redirect(target: impl Into<String>) -> Self {
        Self {
            redirect: Some(target.into()),
            ..Self::default()
        }
    }

    /// The flow already wrote through `FlowContext::response`
    pub fn sent() -> Self {
        Self {
            http_sent: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }
}

/// Response body of a [`DispatchResult`]
///
/// JSON of the form `{"type": "Buffer", "data": [bytes...]}` is read as a
/// binary payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum ResponsePayload {
    Json(Value),
    Binary(Bytes),
}

impl From<Value> for ResponsePayload {
    fn from(value: Value) -> Self {
        match tagged_buffer(&value) {
            Some(bytes) => Self::Binary(Bytes::from(bytes)),
            None => Self::Json(value),
        }
    }
}

fn tagged_buffer(value: &Value) -> Option<Vec<u8>> {
    let obj = value.as_object()?;
    if obj.get("type")?.as_str()? != "Buffer" {
        return None;
    }
    obj.get("data")?
        .as_array()?
        .iter()
        .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect()
}

/// Flow failure with an optional HTTP status and client-facing description
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", .description.as_deref().unwrap_or(INTERNAL_ERROR_DESCRIPTION))]
pub struct FlowError {
    pub status: Option<u16>,
    pub description: Option<String>,
}

impl FlowError {
    pub fn new(status: u16, description: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            description: Some(description.into()),
        }
    }

    /// Dispatch result the client sees for this failure
    pub fn into_result(self) -> DispatchResult {
        let description = self
            .description
            .unwrap_or_else(|| INTERNAL_ERROR_DESCRIPTION.to_string());
        DispatchResult {
            status: Some(self.status.unwrap_or(500)),
            response: Some(ResponsePayload::Json(Value::String(description))),
            ..DispatchResult::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_camel_case() {
        let r: DispatchResult = serde_json::from_value(json!({
            "status": 201,
            "response": {"id": 1},
            "headers": {"X-Trace": "abc"},
            "httpSent": false
        }))
        .unwrap();
        assert_eq!(r.status, Some(201));
        assert_eq!(r.response, Some(ResponsePayload::Json(json!({"id": 1}))));
        assert_eq!(r.headers.unwrap()["X-Trace"], "abc");
        assert!(!r.http_sent);

        let r: DispatchResult = serde_json::from_value(json!({"httpSent": true})).unwrap();
        assert!(r.http_sent);
        assert!(r.response.is_none());

        let r: DispatchResult = serde_json::from_value(json!({"response": null})).unwrap();
        assert_eq!(r.response, Some(ResponsePayload::Json(Value::Null)));
    }

    #[test]
    fn test_tagged_buffer_is_binary() {
        let p = ResponsePayload::from(json!({"type": "Buffer", "data": [104, 105, 0, 255]}));
        assert_eq!(p, ResponsePayload::Binary(Bytes::from_static(b"hi\0\xff")));

        // Out-of-range bytes keep the value as JSON
        let v = json!({"type": "Buffer", "data": [256]});
        assert_eq!(ResponsePayload::from(v.clone()), ResponsePayload::Json(v));

        let v = json!({"type": "Other", "data": [1]});
        assert_eq!(ResponsePayload::from(v.clone()), ResponsePayload::Json(v));
    }

    #[test]
    fn test_flow_error_into_result() {
        let r = FlowError::new(404, "nope").into_result();
        assert_eq!(r.status, Some(404));
        assert_eq!(r.response, Some(ResponsePayload::Json(json!("nope"))));
        assert!(r.redirect.is_none() && r.headers.is_none() && !r.http_sent);

        let r = FlowError::default().into_result();
        assert_eq!(r.status, Some(500));
        assert_eq!(
            r.response,
            Some(ResponsePayload::Json(json!(INTERNAL_ERROR_DESCRIPTION)))
        );
    }

    #[test]
    fn test_builders() {
        let r = DispatchResult::json(json!([1, 2]))
            .with_status(202)
            .with_header("x-a", "1");
        assert_eq!(r.status, Some(202));
        assert_eq!(r.headers.unwrap()["x-a"], "1");
        assert_eq!(
            DispatchResult::redirect("/next").redirect.as_deref(),
            Some("/next")
        );
        assert!(DispatchResult::sent().http_sent);
    }
}
