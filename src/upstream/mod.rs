//! Upstream Mist API access.
//!
//! Catalog tools are thin pass-throughs: they forward the operation name and
//! the agent's arguments to an [`UpstreamClient`] and return its JSON.

mod client;

pub use client::HttpUpstream;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Upstream API is not configured (set --upstream-url)")]
    Unconfigured,

    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Invokes one API operation with JSON arguments.
    async fn call(&self, operation: &str, arguments: Value) -> Result<Value, UpstreamError>;
}

/// Used when no upstream URL is configured; every call fails.
pub struct UnconfiguredUpstream;

#[async_trait]
impl UpstreamClient for UnconfiguredUpstream {
    async fn call(&self, _operation: &str, _arguments: Value) -> Result<Value, UpstreamError> {
        Err(UpstreamError::Unconfigured)
    }
}
