//! Flow engine boundary
//!
//! The dispatcher hands every routed request to a [`FlowEngine`] together
//! with the extracted input and a [`FlowContext`] carrying the raw request and
//! a write-once response slot. The engine answers with a [`DispatchResult`]
//! or fails with a [`FlowError`].

mod context;
mod echo;
mod result;

pub use context::{FlowContext, RequestHandle, ResponseHandle};
pub use echo::EchoEngine;
pub use result::{DispatchResult, FlowError, ResponsePayload};

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

/// Future returned by [`FlowEngine::execute`]
pub type FlowFuture = Pin<Box<dyn Future<Output = Result<DispatchResult, FlowError>> + Send>>;

/// Values extracted from the request for the flow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlowInput {
    /// Path placeholders, undecoded
    pub params: BTreeMap<String, String>,
    /// Query string; the last occurrence of a key wins
    pub query: BTreeMap<String, String>,
    /// Lower-cased header names; repeated headers joined with `, `
    pub headers: BTreeMap<String, String>,
}

impl FlowInput {
    /// JSON object form, as taken by the body parsers
    pub fn into_map(self) -> Map<String, Value> {
        let to_object = |m: BTreeMap<String, String>| {
            Value::Object(m.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
        };
        let mut map = Map::new();
        map.insert("params".to_string(), to_object(self.params));
        map.insert("query".to_string(), to_object(self.query));
        map.insert("headers".to_string(), to_object(self.headers));
        map
    }
}

/// Runs the business logic behind a handler id
///
/// Any `Fn(String, FlowInput, FlowContext) -> impl Future` closure with the
/// right output implements this trait.
pub trait FlowEngine: Send + Sync + 'static {
    fn execute(&self, handler: &str, input: FlowInput, ctx: FlowContext) -> FlowFuture;
}

impl<F, Fut> FlowEngine for F
where
    F: Fn(String, FlowInput, FlowContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<DispatchResult, FlowError>> + Send + 'static,
{
    fn execute(&self, handler: &str, input: FlowInput, ctx: FlowContext) -> FlowFuture {
        Box::pin(self(handler.to_string(), input, ctx))
    }
}
