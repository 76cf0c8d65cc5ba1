// Reference engine used by the binary: echoes the routed input back as JSON

use super::{DispatchResult, FlowContext, FlowEngine, FlowError, FlowFuture, FlowInput};
use serde_json::json;

pub struct EchoEngine {
    not_found: String,
}

impl EchoEngine {
    /// `not_found` is the reserved handler id the route table falls back to
    pub fn new(not_found: impl Into<String>) -> Self {
        Self {
            not_found: not_found.into(),
        }
    }
}

impl FlowEngine for EchoEngine {
    fn execute(&self, handler: &str, input: FlowInput, _ctx: FlowContext) -> FlowFuture {
        let outcome = if handler == self.not_found {
            Err(FlowError::new(404, "Not found"))
        } else {
            Ok(DispatchResult::json(json!({
                "handler": handler,
                "params": input.params,
                "query": input.query,
            })))
        };
        Box::pin(async move { outcome })
    }
}
