//! HTTP client for the upstream API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{UpstreamClient, UpstreamError};

/// Forwards operations as `POST {base_url}/{operation}` with a JSON body.
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUpstream {
    /// Create a new upstream client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the API gateway (e.g., "https://api.mist.com/mcp")
    /// * `api_token` - Token sent as `Authorization: Token <api_token>`
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: &str, api_token: Option<&str>, timeout_sec: u64) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = api_token {
            let mut value = HeaderValue::from_str(&format!("Token {}", token))
                .context("API token contains invalid header characters")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        // Ensure base_url doesn't have trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    fn operation_url(&self, operation: &str) -> String {
        format!("{}/{}", self.base_url, operation)
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn call(&self, operation: &str, arguments: Value) -> Result<Value, UpstreamError> {
        let url = self.operation_url(operation);
        debug!("Calling upstream operation {} at {}", operation, url);

        let response = self.client.post(&url).json(&arguments).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Some operations answer with an empty body.
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }))
    }
}
