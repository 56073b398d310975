//! Tool dispatch.
//!
//! Every `tools/call` goes through [`ToolDispatcher::call`]: lookup, the
//! gatekeeper check, the per-call consent exchange for write tools, then the
//! handler.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::context::ToolContext;
use super::gatekeeper::ToolGatekeeper;
use super::protocol::{McpError, ToolDefinition, ToolsCallResult};
use super::registry::{McpRegistry, RegisteredTool, ToolResult};
use crate::catalog::CapabilityCatalog;
use crate::consent::{ConsentDecision, WriteAccess};
use crate::error::GatewayError;
use crate::server::metrics;
use crate::session::Session;

pub struct ToolDispatcher {
    registry: McpRegistry,
    gatekeeper: ToolGatekeeper,
}

impl ToolDispatcher {
    pub fn new(registry: McpRegistry, catalog: Arc<CapabilityCatalog>) -> Self {
        Self {
            registry,
            gatekeeper: ToolGatekeeper::new(catalog),
        }
    }

    pub fn registry(&self) -> &McpRegistry {
        &self.registry
    }

    /// Tools the session may currently call.
    pub fn list_tools(&self, session: &Session) -> Vec<ToolDefinition> {
        self.registry
            .definitions(|tool| self.gatekeeper.is_visible(session, tool))
    }

    pub async fn call(&self, ctx: ToolContext, name: &str, arguments: Value) -> ToolResult {
        let tool = self
            .registry
            .get_tool(name)
            .ok_or_else(|| McpError::MethodNotFound(format!("Unknown tool: {}", name)))?;

        if let Err(e) = self.gatekeeper.check(&ctx.session, tool) {
            warn!(
                "Rejected call to '{}' for session {}: {}",
                name,
                ctx.session_id(),
                e
            );
            metrics::record_tool_call(name, "rejected", None);
            return Err(e.into());
        }

        if tool.is_write() && ctx.session.write_access == WriteAccess::ConsentRequired {
            if let Some(result) = self.ask_consent(&ctx, tool, &arguments).await? {
                return Ok(result);
            }
        }

        debug!("Executing tool '{}' for session {}", name, ctx.session_id());
        let started = Instant::now();
        let result = (tool.handler)(ctx, arguments).await;
        let outcome = match &result {
            Ok(r) if r.is_error == Some(true) => "error",
            Ok(_) => "success",
            Err(_) => "failure",
        };
        metrics::record_tool_call(name, outcome, Some(started.elapsed()));
        result
    }

    /// Runs the consent exchange. `Ok(None)` means the user accepted and the
    /// call should proceed; `Ok(Some(_))` is the benign result to return instead.
    async fn ask_consent(
        &self,
        ctx: &ToolContext,
        tool: &RegisteredTool,
        arguments: &Value,
    ) -> Result<Option<ToolsCallResult>, McpError> {
        let prompt = tool.consent_prompt.ok_or_else(|| {
            McpError::InternalError(format!("Write tool '{}' has no consent prompt", tool.name))
        })?;
        let message = prompt(arguments)?;

        let decision = match ctx.peer.request_consent(&message).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(
                    "Consent for '{}' could not be collected in session {}: {}",
                    tool.name,
                    ctx.session_id(),
                    e
                );
                metrics::record_consent_decision("unsupported");
                metrics::record_tool_call(&tool.name, "consent_unsupported", None);
                return Err(GatewayError::consent_unsupported().into());
            }
        };

        info!(
            "Consent for '{}' in session {}: {}",
            tool.name,
            ctx.session_id(),
            decision
        );
        metrics::record_consent_decision(decision.as_str());

        let message = match decision {
            ConsentDecision::Accept => return Ok(None),
            ConsentDecision::Decline => "Action declined by user.",
            ConsentDecision::Cancel => "Action canceled by user.",
        };
        metrics::record_tool_call(&tool.name, decision.as_str(), None);
        let result = ToolsCallResult::json(&json!({ "message": message }))
            .map_err(|e| McpError::InternalError(e.to_string()))?;
        Ok(Some(result))
    }
}
