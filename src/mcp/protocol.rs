//! MCP Protocol Types
//!
//! Implements the Model Context Protocol message types.
//! MCP is essentially JSON-RPC 2.0 with specific method names and schemas.
//! Both directions carry requests: the gateway sends `elicitation/create`
//! requests to the client and receives the matching responses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GatewayError;

/// JSON-RPC version string
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol version we support
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

// ============================================================================
// Core Message Types
// ============================================================================

/// Incoming request from MCP client
#[derive(Debug, Clone, Deserialize)]
pub struct McpRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// Any JSON-RPC message, before it is classified.
#[derive(Debug, Clone, Deserialize)]
struct RawMessage {
    #[serde(default)]
    jsonrpc: Option<String>,
    #[serde(default)]
    id: Option<RequestId>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Classified inbound message.
#[derive(Debug, Clone)]
pub enum McpIncoming {
    Request(McpRequest),
    Notification {
        method: String,
        params: Option<Value>,
    },
    /// Response to a request the server sent. `Err` carries the JSON-RPC error object.
    Response {
        id: RequestId,
        outcome: Result<Value, Value>,
    },
}

impl McpIncoming {
    /// Parses and classifies one JSON-RPC message.
    pub fn parse(text: &str) -> Result<Self, McpError> {
        let raw: RawMessage =
            serde_json::from_str(text).map_err(|e| McpError::ParseError(e.to_string()))?;

        let jsonrpc = raw.jsonrpc.unwrap_or_default();
        if jsonrpc != JSONRPC_VERSION {
            return Err(McpError::InvalidRequest(format!(
                "Unsupported jsonrpc version: '{}'",
                jsonrpc
            )));
        }

        match (raw.method, raw.id) {
            (Some(method), Some(id)) => Ok(McpIncoming::Request(McpRequest {
                jsonrpc,
                id,
                method,
                params: raw.params,
            })),
            (Some(method), None) => Ok(McpIncoming::Notification {
                method,
                params: raw.params,
            }),
            (None, Some(id)) => {
                let outcome = match (raw.result, raw.error) {
                    (_, Some(error)) => Err(error),
                    (Some(result), None) => Ok(result),
                    (None, None) => {
                        return Err(McpError::InvalidRequest(
                            "Response carries neither result nor error".to_string(),
                        ))
                    }
                };
                Ok(McpIncoming::Response { id, outcome })
            }
            (None, None) => Err(McpError::InvalidRequest(
                "Message has neither method nor id".to_string(),
            )),
        }
    }
}

/// Response to MCP client
#[derive(Debug, Clone, Serialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpErrorResponse>,
}

impl McpResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<RequestId>, error: McpError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Request sent by the server to the client
#[derive(Debug, Clone, Serialize)]
pub struct McpOutgoingRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Notification sent by the server to the client
#[derive(Debug, Clone, Serialize)]
pub struct McpNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Everything the server writes to a connection.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum McpOutbound {
    Response(McpResponse),
    Request(McpOutgoingRequest),
    Notification(McpNotification),
}

impl McpOutbound {
    pub fn request(id: RequestId, method: &str, params: Value) -> Self {
        McpOutbound::Request(McpOutgoingRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.to_string(),
            params: Some(params),
        })
    }

    pub fn notification(method: &str) -> Self {
        McpOutbound::Notification(McpNotification {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params: None,
        })
    }
}

impl From<McpResponse> for McpOutbound {
    fn from(response: McpResponse) -> Self {
        McpOutbound::Response(response)
    }
}

/// Request ID can be string or number
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
}

/// Error response structure
#[derive(Debug, Clone, Serialize)]
pub struct McpErrorResponse {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// ============================================================================
// Error Codes (JSON-RPC + MCP specific)
// ============================================================================

/// MCP error types
#[derive(Debug, Clone)]
pub enum McpError {
    // JSON-RPC standard errors
    ParseError(String),
    InvalidRequest(String),
    MethodNotFound(String),
    InvalidParams(String),
    InternalError(String),

    // Gateway specific errors
    NotInitialized,
    MissingContext(String),
    ToolDisabled(Box<GatewayError>),
    ConsentUnsupported(String),
    ToolExecutionFailed(String),
}

impl McpError {
    pub fn code(&self) -> i32 {
        match self {
            McpError::ParseError(_) => -32700,
            McpError::InvalidRequest(_) => -32600,
            McpError::MethodNotFound(_) => -32601,
            McpError::InvalidParams(_) => -32602,
            McpError::InternalError(_) => -32603,
            McpError::NotInitialized => -32002,
            McpError::MissingContext(_) => -32003,
            McpError::ToolDisabled(_) => -32004,
            McpError::ToolExecutionFailed(_) => -32005,
            McpError::ConsentUnsupported(_) => -32006,
        }
    }

    pub fn message(&self) -> String {
        match self {
            McpError::ParseError(msg) => format!("Parse error: {}", msg),
            McpError::InvalidRequest(msg) => format!("Invalid request: {}", msg),
            McpError::MethodNotFound(method) => format!("Method not found: {}", method),
            McpError::InvalidParams(msg) => format!("Invalid params: {}", msg),
            McpError::InternalError(msg) => format!("Internal error: {}", msg),
            McpError::NotInitialized => "Server not initialized".to_string(),
            McpError::MissingContext(msg) => msg.clone(),
            McpError::ToolDisabled(err) => err.to_string(),
            McpError::ConsentUnsupported(msg) => msg.clone(),
            McpError::ToolExecutionFailed(msg) => format!("Tool execution failed: {}", msg),
        }
    }

    /// Gateway errors the agent is expected to read and act upon.
    pub fn gateway_payload(&self) -> Option<Value> {
        match self {
            McpError::ToolDisabled(err) => Some(err.payload()),
            McpError::ConsentUnsupported(msg) => {
                Some(GatewayError::ConsentUnsupported(msg.clone()).payload())
            }
            _ => None,
        }
    }
}

impl From<GatewayError> for McpError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::MissingContext { .. } => McpError::MissingContext(err.to_string()),
            GatewayError::ToolDisabled(_) => McpError::ToolDisabled(Box::new(err)),
            GatewayError::UnknownCategory(_) => McpError::InvalidParams(err.to_string()),
            GatewayError::ConsentUnsupported(msg) => McpError::ConsentUnsupported(msg),
        }
    }
}

impl From<McpError> for McpErrorResponse {
    fn from(err: McpError) -> Self {
        McpErrorResponse {
            code: err.code(),
            message: err.message(),
            data: err.gateway_payload(),
        }
    }
}

// ============================================================================
// MCP Method Names
// ============================================================================

pub mod methods {
    // Lifecycle
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const CANCELLED: &str = "notifications/cancelled";

    // Tools
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";

    // Server-initiated consent request
    pub const ELICITATION_CREATE: &str = "elicitation/create";

    // Ping
    pub const PING: &str = "ping";
}

// ============================================================================
// Initialize Messages
// ============================================================================

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub capabilities: ClientCapabilities,
    #[serde(default)]
    pub client_info: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ClientCapabilities {
    #[serde(default)]
    pub roots: Option<Value>,
    #[serde(default)]
    pub sampling: Option<Value>,
    #[serde(default)]
    pub elicitation: Option<Value>,
}

impl ClientCapabilities {
    pub fn supports_elicitation(&self) -> bool {
        matches!(self.elicitation, Some(ref v) if !v.is_null())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

// ============================================================================
// Tools Messages
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ToolsListResult {
    pub tools: Vec<ToolDefinition>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolsCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCallResult {
    pub content: Vec<ToolResultContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolResultContent {
    Text { text: String },
}

impl ToolsCallResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultContent::Text { text: text.into() }],
            structured_content: None,
            is_error: None,
        }
    }

    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let text = serde_json::to_string_pretty(value)?;
        Ok(Self::text(text))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultContent::Text {
                text: message.into(),
            }],
            structured_content: None,
            is_error: Some(true),
        }
    }

    /// Error result whose payload is both readable text and structured content.
    pub fn structured_error(payload: Value) -> Self {
        Self {
            content: vec![ToolResultContent::Text {
                text: payload.to_string(),
            }],
            structured_content: Some(payload),
            is_error: Some(true),
        }
    }

    /// Text of the first content block.
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|content| match content {
            ToolResultContent::Text { text } => text.as_str(),
        })
    }
}

// ============================================================================
// Ping
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PingResult {}
