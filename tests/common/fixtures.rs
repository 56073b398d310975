//! Test doubles for the gateway's external collaborators

use async_trait::async_trait;
use mist_mcp_gateway::upstream::{UpstreamClient, UpstreamError};
use serde_json::{json, Value};
use std::sync::Mutex;

/// Upstream API stand-in that records every call and echoes it back.
#[derive(Default)]
pub struct StubUpstream {
    calls: Mutex<Vec<(String, Value)>>,
}

#[allow(dead_code)]
impl StubUpstream {
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(op, _)| op == operation)
            .count()
    }
}

#[async_trait]
impl UpstreamClient for StubUpstream {
    async fn call(&self, operation: &str, arguments: Value) -> Result<Value, UpstreamError> {
        self.calls
            .lock()
            .unwrap()
            .push((operation.to_string(), arguments.clone()));
        Ok(json!({ "operation": operation, "arguments": arguments }))
    }
}
