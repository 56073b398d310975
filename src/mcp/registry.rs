//! MCP Tool Registry
//!
//! Manages registration and lookup of tools. Each tool descriptor carries its
//! access tag, which the dispatcher consults before invoking the handler.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{json, Value};

use super::context::ToolContext;
use super::protocol::{McpError, ToolDefinition, ToolsCallResult};

// ============================================================================
// Tool Types
// ============================================================================

/// Result type for tool execution
pub type ToolResult = Result<ToolsCallResult, McpError>;

/// Boxed future for async tool execution
pub type ToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

/// Tool handler function type
pub type ToolHandler = Arc<dyn Fn(ToolContext, Value) -> ToolFuture + Send + Sync>;

/// Builds the consent question for a write call from its arguments.
/// Invalid arguments are reported before any consent is requested.
pub type ConsentPrompt = fn(&Value) -> Result<String, McpError>;

/// A registered tool with metadata and handler
pub struct RegisteredTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub access: ToolAccess,
    /// Catalog category the tool belongs to, if any.
    pub category: Option<String>,
    pub consent_prompt: Option<ConsentPrompt>,
    pub handler: ToolHandler,
}

impl RegisteredTool {
    pub fn is_write(&self) -> bool {
        self.access == ToolAccess::Write
    }

    pub fn definition(&self) -> ToolDefinition {
        let annotations = match self.access {
            ToolAccess::Read => json!({ "title": self.name, "readOnlyHint": true }),
            ToolAccess::Write => json!({
                "title": self.name,
                "readOnlyHint": false,
                "destructiveHint": true,
                "openWorldHint": true,
            }),
        };
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
            annotations: Some(annotations),
        }
    }
}

/// Capability tag of a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolAccess {
    Read,
    /// Mutates upstream state; gated by the session's write access.
    Write,
}

// ============================================================================
// Registry
// ============================================================================

/// Registry for MCP tools
pub struct McpRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl McpRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool
    pub fn register_tool(&mut self, tool: RegisteredTool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    pub fn get_tool(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// Definitions of the tools accepted by `visible`, sorted by name.
    pub fn definitions<F>(&self, visible: F) -> Vec<ToolDefinition>
    where
        F: Fn(&RegisteredTool) -> bool,
    {
        self.tools
            .values()
            .filter(|tool| visible(tool))
            .map(RegisteredTool::definition)
            .collect()
    }

    pub fn tools(&self) -> impl Iterator<Item = &RegisteredTool> {
        self.tools.values()
    }

    /// Get the number of registered tools
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub fn write_tool_count(&self) -> usize {
        self.tools.values().filter(|tool| tool.is_write()).count()
    }
}

impl Default for McpRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Builder helpers
// ============================================================================

/// Builder for registering a tool
pub struct ToolBuilder {
    name: String,
    description: String,
    input_schema: Value,
    access: ToolAccess,
    category: Option<String>,
    consent_prompt: Option<ConsentPrompt>,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
            access: ToolAccess::Read,
            category: None,
            consent_prompt: None,
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Tags the tool as a write tool guarded by the given consent prompt.
    pub fn write(mut self, prompt: ConsentPrompt) -> Self {
        self.access = ToolAccess::Write;
        self.consent_prompt = Some(prompt);
        self
    }

    pub fn build<F, Fut>(self, handler: F) -> RegisteredTool
    where
        F: Fn(ToolContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult> + Send + 'static,
    {
        RegisteredTool {
            name: self.name,
            description: self.description,
            input_schema: self.input_schema,
            access: self.access,
            category: self.category,
            consent_prompt: self.consent_prompt,
            handler: Arc::new(move |ctx, params| Box::pin(handler(ctx, params))),
        }
    }
}
