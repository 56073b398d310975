//! MCP Tools
//!
//! The capability management tool, the catalog pass-through tools and the
//! write tools.

pub mod manage;
pub mod passthrough;
pub mod write;

pub use manage::{enable_categories, EnableOutcome};

use super::registry::McpRegistry;
use crate::catalog::CapabilityCatalog;

/// Register all tools with the registry
pub fn register_all_tools(
    registry: &mut McpRegistry,
    catalog: &CapabilityCatalog,
    enable_write_tools: bool,
) {
    registry.register_tool(manage::manage_tools_tool());
    passthrough::register_tools(registry, catalog);
    if enable_write_tools {
        write::register_tools(registry);
    }
}
