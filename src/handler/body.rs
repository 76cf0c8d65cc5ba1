//! Request body parsers for flows
//!
//! Both parsers read the whole body from the request handle (bounded by the
//! configured limit) and return the given data with a `body` field added. An
//! empty body parses as `{}`.

use crate::engine::{FlowError, RequestHandle};
use crate::http::BoxError;
use http_body_util::BodyExt;
use hyper::body::Bytes;
use serde_json::{Map, Value};
use thiserror::Error;

/// Numeric bracket indices above this become object keys
const ARRAY_INDEX_LIMIT: usize = 20;

/// Bracket segments past this depth stay in the key as one literal segment
const MAX_DEPTH: usize = 5;

/// Pairs past this count are ignored
const PARAMETER_LIMIT: usize = 1000;

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("request body already consumed")]
    Consumed,

    #[error("request body exceeds {0} bytes")]
    TooLarge(u64),

    #[error("failed to read request body: {0}")]
    Read(BoxError),

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<BodyError> for FlowError {
    fn from(err: BodyError) -> Self {
        let status = match err {
            BodyError::TooLarge(_) => 413,
            BodyError::Json(_) | BodyError::Read(_) => 400,
            BodyError::Consumed => 500,
        };
        Self::new(status, err.to_string())
    }
}

/// Add the request body, parsed as JSON, to `data`
pub async fn with_json_body(
    mut data: Map<String, Value>,
    req: &mut RequestHandle,
) -> Result<Map<String, Value>, BodyError> {
    let bytes = read_body(req).await?;
    let body = if bytes.is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_slice(&bytes)?
    };
    data.insert("body".to_string(), body);
    Ok(data)
}

/// Add the request body, parsed as URL-encoded form data with bracket
/// nesting (`a[b]=1`, `list[]=x`), to `data`
pub async fn with_form_body(
    mut data: Map<String, Value>,
    req: &mut RequestHandle,
) -> Result<Map<String, Value>, BodyError> {
    let bytes = read_body(req).await?;
    data.insert("body".to_string(), parse_extended_form(&bytes));
    Ok(data)
}

async fn read_body(req: &mut RequestHandle) -> Result<Bytes, BodyError> {
    let mut body = req.take_body().ok_or(BodyError::Consumed)?;
    let limit = req.body_limit();

    // Frames are pulled one at a time so the cap applies before buffering
    let mut buf = Vec::new();
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(BodyError::Read)?;
        let Ok(data) = frame.into_data() else {
            continue;
        };
        let total = u64::try_from(buf.len() + data.len()).unwrap_or(u64::MAX);
        if total > limit {
            return Err(BodyError::TooLarge(limit));
        }
        buf.extend_from_slice(&data);
    }
    Ok(Bytes::from(buf))
}

/// Parse `application/x-www-form-urlencoded` with nested keys
///
/// Repeated keys collect into an array; `[]` appends; small numeric indices
/// address array slots.
pub fn parse_extended_form(input: &[u8]) -> Value {
    let mut root = Value::Object(Map::new());
    for (key, value) in url::form_urlencoded::parse(input).take(PARAMETER_LIMIT) {
        assign(&mut root, &split_key(&key), value.into_owned());
    }
    root
}

enum Segment {
    Push,
    Index(usize),
    Name,
}

fn classify(segment: &str) -> Segment {
    if segment.is_empty() {
        return Segment::Push;
    }
    match segment.parse::<usize>() {
        Ok(i) if i <= ARRAY_INDEX_LIMIT => Segment::Index(i),
        _ => Segment::Name,
    }
}

/// `a[b][]` -> `["a", "b", ""]`
///
/// Past [`MAX_DEPTH`] brackets the rest of the key is kept verbatim:
/// `a[b][c][d][e][f][g]` -> `["a", "b", "c", "d", "e", "f", "[g]"]`
fn split_key(key: &str) -> Vec<&str> {
    let open = match key.find('[') {
        Some(0) | None => return vec![key],
        Some(i) => i,
    };

    let mut segments = vec![&key[..open]];
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        if segments.len() > MAX_DEPTH {
            break;
        }
        let Some(close) = inner.find(']') else { break };
        segments.push(&inner[..close]);
        rest = &inner[close + 1..];
    }
    if !rest.is_empty() {
        segments.push(rest);
    }
    segments
}

fn container_for(next: &str) -> Value {
    match classify(next) {
        Segment::Name => Value::Object(Map::new()),
        Segment::Push | Segment::Index(_) => Value::Array(Vec::new()),
    }
}

fn assign(target: &mut Value, segments: &[&str], value: String) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    match target {
        Value::Object(map) => {
            if rest.is_empty() {
                match map.get_mut(*head) {
                    Some(existing) => append(existing, value),
                    None => {
                        map.insert((*head).to_string(), Value::String(value));
                    }
                }
            } else {
                let child = map
                    .entry((*head).to_string())
                    .or_insert_with(|| container_for(rest[0]));
                assign(child, rest, value);
            }
        }
        Value::Array(items) => {
            let slot = match classify(head) {
                Segment::Index(i) if i < items.len() => Some(i),
                _ => None,
            };
            if rest.is_empty() {
                match slot {
                    Some(i) => append(&mut items[i], value),
                    None => items.push(Value::String(value)),
                }
            } else {
                let i = slot.unwrap_or_else(|| {
                    items.push(container_for(rest[0]));
                    items.len() - 1
                });
                assign(&mut items[i], rest, value);
            }
        }
        // A scalar already sits here; the first value is kept
        _ => {}
    }
}

fn append(existing: &mut Value, value: String) {
    if let Value::Array(items) = existing {
        items.push(Value::String(value));
        return;
    }
    if existing.is_string() {
        let first = existing.take();
        *existing = Value::Array(vec![first, Value::String(value)]);
    }
}
