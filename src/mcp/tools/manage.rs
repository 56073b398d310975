//! manageMcpTools
//!
//! The always-available tool through which an agent enables tool categories
//! for its own session. Enabling is additive: categories are never removed,
//! and the essential tools are always part of the result.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::catalog::{CapabilityCatalog, CategoryRequest, CategorySelection};
use crate::error::GatewayError;
use crate::mcp::context::ToolContext;
use crate::mcp::protocol::{McpError, ToolsCallResult};
use crate::mcp::registry::{RegisteredTool, ToolBuilder, ToolResult};
use crate::server::metrics;
use crate::session::{Session, SessionIdentity, SessionRegistry};

pub const MANAGE_TOOLS_NAME: &str = "manageMcpTools";

#[derive(Debug, Default, Deserialize)]
struct ManageToolsParams {
    #[serde(default)]
    enable_mcp_tools_categories: Option<CategoryRequest>,
    #[serde(default)]
    list_available_categories: bool,
}

/// Result of applying a category request to a session.
#[derive(Debug, Clone)]
pub struct EnableOutcome {
    pub session: Session,
    /// Categories that were not enabled before this request.
    pub newly_enabled: Vec<String>,
    /// Names that did not resolve against the catalog.
    pub unknown: Vec<String>,
}

/// Enables the requested categories for the session of `identity`.
///
/// Unknown names are logged and skipped. The new categories are merged into
/// the session inside a single registry critical section, so concurrent
/// enables on the same session all take effect.
pub async fn enable_categories(
    sessions: &Arc<SessionRegistry>,
    catalog: &CapabilityCatalog,
    identity: &SessionIdentity,
    request: &CategoryRequest,
) -> EnableOutcome {
    let CategorySelection { resolved, unknown } = catalog.parse_selection(request);
    for name in &unknown {
        warn!("{}, skipping", GatewayError::UnknownCategory(name.clone()));
    }

    let (session, newly_enabled) = sessions
        .enable(identity, |session| {
            let mut newly_enabled = Vec::new();
            for category in resolved {
                if session.enabled_categories.contains(&category) {
                    debug!(
                        "Category '{}' already enabled for session {}",
                        category, session.id
                    );
                    continue;
                }
                match catalog.tools_for(&category) {
                    Ok(operations) => {
                        session.enabled_tools.extend(operations.iter().cloned());
                        session.enabled_categories.insert(category.clone());
                        metrics::record_category_enabled(&category);
                        newly_enabled.push(category);
                    }
                    Err(e) => warn!("{}, skipping", e),
                }
            }
            newly_enabled
        })
        .await;

    if !newly_enabled.is_empty() {
        info!(
            "Enabled categories {:?} for session {} ({} tools enabled)",
            newly_enabled,
            session.id,
            session.enabled_tools.len()
        );
    }

    EnableOutcome {
        session,
        newly_enabled,
        unknown,
    }
}

pub fn manage_tools_tool() -> RegisteredTool {
    ToolBuilder::new(MANAGE_TOOLS_NAME)
        .description(
            "Used to reconfigure the MCP server and define a different list of tools based on \
             the use case (monitor, troubleshooting, ...). IMPORTANT: This tool requires user \
             confirmation after execution before proceeding with other actions.",
        )
        .input_schema(json!({
            "type": "object",
            "properties": {
                "enable_mcp_tools_categories": {
                    "description": "Enable tools within the MCP based on the tool category. Accepts a list of category names or a comma-separated string.",
                    "anyOf": [
                        { "type": "array", "items": { "type": "string" } },
                        { "type": "string" }
                    ]
                },
                "list_available_categories": {
                    "type": "boolean",
                    "description": "List the available tool categories and whether they are enabled for this session.",
                    "default": false
                }
            }
        }))
        .build(manage_tools_handler)
}

async fn manage_tools_handler(ctx: ToolContext, params: Value) -> ToolResult {
    let params: ManageToolsParams = if params.is_null() {
        ManageToolsParams::default()
    } else {
        serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))?
    };

    let Some(request) = params.enable_mcp_tools_categories else {
        return list_categories(&ctx.catalog, &ctx.session);
    };

    let outcome = enable_categories(&ctx.sessions, &ctx.catalog, &ctx.identity, &request).await;

    // Best-effort: the session is already updated, a lost notification only
    // delays the client's refresh.
    if let Err(e) = ctx.peer.notify_tools_list_changed().await {
        warn!(
            "Failed to notify session {} of tool list change: {}",
            outcome.session.id, e
        );
    }

    let mut text = stop_message(&confirmation_message(&ctx.catalog, &outcome));
    if params.list_available_categories {
        let listing = category_listing(&ctx.catalog, &outcome.session);
        text.push_str("\n\nAvailable categories:\n");
        text.push_str(
            &serde_json::to_string_pretty(&listing)
                .map_err(|e| McpError::InternalError(e.to_string()))?,
        );
    }
    Ok(ToolsCallResult::text(text))
}

#[derive(Debug, Serialize)]
struct CategoryListing<'a> {
    name: &'a str,
    description: Option<&'a str>,
    tools_count: usize,
    enabled: bool,
}

fn category_listing<'a>(
    catalog: &'a CapabilityCatalog,
    session: &Session,
) -> Vec<CategoryListing<'a>> {
    catalog
        .entries()
        .map(|entry| CategoryListing {
            name: &entry.name,
            description: entry.description.as_deref(),
            tools_count: entry.tools.len(),
            enabled: session.is_all_tools_mode()
                || session.enabled_categories.contains(&entry.name),
        })
        .collect()
}

fn list_categories(catalog: &CapabilityCatalog, session: &Session) -> ToolResult {
    ToolsCallResult::json(&json!({
        "mode": session.mode,
        "categories": category_listing(catalog, session),
        "hint": "Call manageMcpTools with enable_mcp_tools_categories to enable one or more categories.",
    }))
    .map_err(|e| McpError::InternalError(e.to_string()))
}

fn confirmation_message(catalog: &CapabilityCatalog, outcome: &EnableOutcome) -> String {
    let enabled: BTreeMap<&str, &[String]> = outcome
        .session
        .enabled_categories
        .iter()
        .filter_map(|category| {
            catalog
                .tools_for(category)
                .ok()
                .map(|tools| (category.as_str(), tools))
        })
        .collect();
    let enabled = serde_json::to_string(&enabled).unwrap_or_else(|_| "{}".to_string());

    let mut message = format!(
        "🔧 MCP TOOLS CONFIGURATION COMPLETE 🔧\n\nTools enabled: {}\n",
        enabled
    );
    if !outcome.unknown.is_empty() {
        message.push_str(&format!(
            "\nUnknown categories ignored: {}\n",
            outcome.unknown.join(", ")
        ));
    }
    message
}

/// Wraps `message` in the instruction that makes the agent pause for the user.
fn stop_message(message: &str) -> String {
    format!(
        "⚠️ STOP: USER CONFIRMATION REQUIRED ⚠️\n\n{}\n\nThis tool has completed its configuration. \
         The agent MUST stop here and ask the user for explicit confirmation before proceeding \
         with any other actions.\n\nAGENT INSTRUCTION: Do not continue with any other tools or \
         actions. Present this message to the user and wait for their explicit confirmation to proceed.",
        message
    )
}
