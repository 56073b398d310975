//! MCP client for end-to-end tests
//!
//! Speaks JSON-RPC over the `/mcp` WebSocket. Server-initiated consent
//! requests are answered automatically according to [`ConsentAnswer`], and
//! notifications are collected for inspection.
//!
//! When the wire format changes, update only this file.

use super::constants::*;
use futures::{SinkExt, StreamExt};
use http::header::{HeaderName, HeaderValue};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// How the client answers `elicitation/create` requests
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum ConsentAnswer {
    /// Reply with `{"action": <action>}`
    Action(&'static str),
    /// Reply with a JSON-RPC error, as a client without elicitation would
    Error,
}

pub struct McpTestClient {
    ws: WsStream,
    next_id: u64,
    /// Answer given to consent requests
    pub consent_answer: ConsentAnswer,
    /// Messages of every consent request received so far
    pub consent_prompts: Vec<String>,
    /// Methods of every notification received so far
    pub notifications: Vec<String>,
}

#[allow(dead_code)]
impl McpTestClient {
    /// Connects to `/mcp` without query parameters or extra headers
    pub async fn connect(base_url: &str) -> Self {
        Self::connect_with(base_url, "", &[]).await
    }

    /// Connects to `/mcp` with a raw query string (without `?`) and headers
    pub async fn connect_with(base_url: &str, query: &str, headers: &[(&str, &str)]) -> Self {
        let mut url = base_url.replace("http://", "ws://") + "/mcp";
        if !query.is_empty() {
            url = format!("{}?{}", url, query);
        }

        let mut request = url
            .into_client_request()
            .expect("Failed to build WebSocket request");
        for (name, value) in headers {
            request.headers_mut().insert(
                HeaderName::from_bytes(name.as_bytes()).expect("Invalid header name"),
                HeaderValue::from_str(value).expect("Invalid header value"),
            );
        }

        let (ws, _) = connect_async(request)
            .await
            .expect("Failed to connect to MCP endpoint");

        Self {
            ws,
            next_id: 1,
            consent_answer: ConsentAnswer::Action("accept"),
            consent_prompts: Vec::new(),
            notifications: Vec::new(),
        }
    }

    async fn send_json(&mut self, value: Value) {
        self.ws
            .send(Message::Text(value.to_string().into()))
            .await
            .expect("Failed to send MCP message");
    }

    async fn next_json(&mut self) -> Value {
        loop {
            let message = timeout(Duration::from_secs(RESPONSE_TIMEOUT_SECS), self.ws.next())
                .await
                .expect("Timed out waiting for MCP message")
                .expect("Connection closed")
                .expect("WebSocket error");
            match message {
                Message::Text(text) => {
                    return serde_json::from_str(text.as_str()).expect("Invalid JSON from server")
                }
                Message::Close(_) => panic!("Server closed the connection"),
                _ => continue,
            }
        }
    }

    async fn answer_consent(&mut self, request: &Value) {
        let message = request["params"]["message"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        self.consent_prompts.push(message);

        let reply = match &self.consent_answer {
            ConsentAnswer::Action(action) => json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "result": { "action": action },
            }),
            ConsentAnswer::Error => json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": { "code": -32601, "message": "Method not found" },
            }),
        };
        self.send_json(reply).await;
    }

    /// Sends a request and returns the full JSON-RPC response
    pub async fn request(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        self.send_json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .await;

        loop {
            let message = self.next_json().await;
            match (message.get("method"), message.get("id")) {
                (Some(method), Some(_)) if method == "elicitation/create" => {
                    self.answer_consent(&message).await;
                }
                (Some(method), None) => {
                    self.notifications
                        .push(method.as_str().unwrap_or_default().to_string());
                }
                (None, Some(response_id)) if *response_id == json!(id) => return message,
                _ => panic!("Unexpected MCP message: {}", message),
            }
        }
    }

    /// Runs the handshake, declaring elicitation support when asked to
    pub async fn initialize(&mut self, elicitation: bool) -> Value {
        let capabilities = if elicitation {
            json!({ "elicitation": {} })
        } else {
            json!({})
        };
        let response = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": "2025-06-18",
                    "capabilities": capabilities,
                    "clientInfo": { "name": "e2e-client", "version": "1.0" },
                }),
            )
            .await;
        assert!(
            response.get("error").is_none(),
            "initialize failed: {}",
            response
        );

        self.send_json(json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized",
        }))
        .await;

        response["result"].clone()
    }

    /// Names of the tools the server currently lists for this session
    pub async fn list_tools(&mut self) -> Vec<String> {
        let response = self.request("tools/list", json!({})).await;
        response["result"]["tools"]
            .as_array()
            .expect("tools/list returned no tools array")
            .iter()
            .filter_map(|tool| tool["name"].as_str().map(str::to_string))
            .collect()
    }

    /// Calls a tool and returns the tool result, failing on JSON-RPC errors
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Value {
        let response = self.call_tool_raw(name, arguments).await;
        assert!(
            response.get("error").is_none(),
            "tools/call {} failed: {}",
            name,
            response
        );
        response["result"].clone()
    }

    /// Calls a tool and returns the full JSON-RPC response
    pub async fn call_tool_raw(&mut self, name: &str, arguments: Value) -> Value {
        self.request(
            "tools/call",
            json!({ "name": name, "arguments": arguments }),
        )
        .await
    }

    /// Text of the first content block of a tool result
    pub fn result_text(result: &Value) -> String {
        result["content"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string()
    }

    /// First content block of a tool result parsed as JSON
    pub fn result_json(result: &Value) -> Value {
        serde_json::from_str(&Self::result_text(result)).expect("Tool result is not JSON")
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
