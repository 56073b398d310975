//! Catalog pass-through tools
//!
//! Every operation named by the catalog is exposed as a read tool that hands
//! its arguments to the upstream API unchanged.

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::manage::MANAGE_TOOLS_NAME;
use crate::catalog::CapabilityCatalog;
use crate::mcp::context::ToolContext;
use crate::mcp::protocol::{McpError, ToolsCallResult};
use crate::mcp::registry::{McpRegistry, RegisteredTool, ToolBuilder, ToolResult};

/// Register one tool per catalog operation.
pub fn register_tools(registry: &mut McpRegistry, catalog: &CapabilityCatalog) {
    for operation in catalog.all_tools() {
        if operation == MANAGE_TOOLS_NAME || registry.get_tool(operation).is_some() {
            continue;
        }
        registry.register_tool(passthrough_tool(catalog, operation));
    }
}

fn passthrough_tool(catalog: &CapabilityCatalog, operation: &str) -> RegisteredTool {
    let category = catalog.category_of(operation);
    let description = match category {
        Some(category) => format!(
            "Mist API operation '{}' ({} category). Arguments are forwarded to the API as-is.",
            operation, category
        ),
        None => format!(
            "Mist API operation '{}'. Arguments are forwarded to the API as-is.",
            operation
        ),
    };

    let mut builder = ToolBuilder::new(operation)
        .description(description)
        .input_schema(json!({
            "type": "object",
            "properties": {},
            "additionalProperties": true
        }));
    if let Some(category) = category {
        builder = builder.category(category);
    }

    let operation = operation.to_string();
    builder.build(move |ctx, params| forward(ctx, operation.clone(), params))
}

async fn forward(ctx: ToolContext, operation: String, params: Value) -> ToolResult {
    let arguments = match params {
        Value::Null => json!({}),
        Value::Object(_) => params,
        other => {
            return Err(McpError::InvalidParams(format!(
                "Arguments must be an object, got {}",
                other
            )))
        }
    };

    debug!(
        "Forwarding '{}' to upstream for session {}",
        operation,
        ctx.session_id()
    );
    call_upstream(&ctx, &operation, arguments).await
}

/// Runs one upstream operation and wraps its JSON answer as a tool result.
pub(super) async fn call_upstream(
    ctx: &ToolContext,
    operation: &str,
    arguments: Value,
) -> ToolResult {
    match ctx.upstream.call(operation, arguments).await {
        Ok(data) => {
            ToolsCallResult::json(&data).map_err(|e| McpError::InternalError(e.to_string()))
        }
        Err(e) => {
            warn!("Upstream call '{}' failed: {}", operation, e);
            Err(McpError::ToolExecutionFailed(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::testing::Fixture;

    #[test]
    fn test_every_catalog_operation_is_registered() {
        let catalog = CapabilityCatalog::builtin();
        let mut registry = McpRegistry::new();
        register_tools(&mut registry, &catalog);

        assert!(registry.get_tool(MANAGE_TOOLS_NAME).is_none());
        assert_eq!(registry.tool_count(), catalog.all_tools().len() - 1);

        let tool = registry.get_tool("getSelf").unwrap();
        assert_eq!(tool.category.as_deref(), Some("self_account"));
        assert!(!tool.is_write());
    }

    #[tokio::test]
    async fn test_forward_passes_arguments_through() {
        let fixture = Fixture::new();
        let identity = Fixture::identity("10.0.0.1", 5000, "managed");
        let ctx = fixture.context(&identity).await;

        let result = forward(ctx, "getSiteInfo".to_string(), json!({ "site_id": "abc" }))
            .await
            .unwrap();
        let body: Value = serde_json::from_str(result.first_text().unwrap()).unwrap();
        assert_eq!(body["operation"], "getSiteInfo");
        assert_eq!(body["arguments"]["site_id"], "abc");

        let calls = fixture.upstream.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "getSiteInfo");
    }

    #[tokio::test]
    async fn test_forward_rejects_non_object_arguments() {
        let fixture = Fixture::new();
        let identity = Fixture::identity("10.0.0.1", 5000, "managed");
        let ctx = fixture.context(&identity).await;

        let result = forward(ctx, "getSiteInfo".to_string(), json!([1, 2])).await;
        assert!(matches!(result, Err(McpError::InvalidParams(_))));
        assert_eq!(fixture.upstream.call_count(), 0);
    }
}
