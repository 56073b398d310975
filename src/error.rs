//! Gateway error taxonomy.
//!
//! These are the domain failures of the capability gateway. Protocol-level
//! failures live in [`crate::mcp::protocol::McpError`], which every variant
//! here converts into.

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Stable machine-readable code carried in a disabled-tool rejection.
pub const TOOL_DISABLED_CODE: &str = "tool_disabled_for_session";

/// Stable machine-readable code carried when consent cannot be collected.
pub const CONSENT_UNSUPPORTED_CODE: &str = "consent_unsupported";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// A networked transport was expected but no peer address was available.
    #[error("No connection context available for {transport} transport")]
    MissingContext { transport: String },

    #[error("{}", .0.message)]
    ToolDisabled(ToolRejection),

    #[error("Unknown tool category: {0}")]
    UnknownCategory(String),

    #[error("{0}")]
    ConsentUnsupported(String),
}

/// Structured payload returned to the caller when a tool is not enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolRejection {
    pub error: String,
    pub message: String,
    pub tool_name: String,
    pub hint: String,
}

impl ToolRejection {
    /// Rejection for a catalog tool whose category has not been enabled yet.
    pub fn not_enabled(tool_name: &str) -> Self {
        Self {
            error: TOOL_DISABLED_CODE.to_string(),
            message: format!(
                "Tool '{}' is not enabled for your session. Use 'manageMcpTools' to enable the required category first.",
                tool_name
            ),
            tool_name: tool_name.to_string(),
            hint: "Try: manageMcpTools(list_available_categories=True) to see available tool categories."
                .to_string(),
        }
    }

    /// Rejection for a write tool on a session whose write access stayed locked.
    pub fn write_locked(tool_name: &str) -> Self {
        Self {
            error: TOOL_DISABLED_CODE.to_string(),
            message: format!(
                "Tool '{}' modifies configuration and write operations are locked for your session.",
                tool_name
            ),
            tool_name: tool_name.to_string(),
            hint: "Reconnect with an AI App that supports elicitation, or ask the operator to set the X-Disable-Elicitation override."
                .to_string(),
        }
    }
}

impl GatewayError {
    pub fn consent_unsupported() -> Self {
        GatewayError::ConsentUnsupported(
            "AI App does not support elicitation. You cannot use it to modify configuration objects. \
             Please use the Mist API directly or use an AI App with elicitation support to modify \
             configuration objects."
                .to_string(),
        )
    }

    /// Machine-readable payload surfaced to the caller.
    pub fn payload(&self) -> Value {
        match self {
            GatewayError::ToolDisabled(rejection) => {
                serde_json::to_value(rejection).unwrap_or_else(|_| json!({}))
            }
            GatewayError::ConsentUnsupported(message) => json!({
                "error": CONSENT_UNSUPPORTED_CODE,
                "message": message,
            }),
            GatewayError::MissingContext { transport } => json!({
                "error": "missing_connection_context",
                "message": self.to_string(),
                "transport": transport,
            }),
            GatewayError::UnknownCategory(name) => json!({
                "error": "unknown_category",
                "message": self.to_string(),
                "category": name,
            }),
        }
    }
}
