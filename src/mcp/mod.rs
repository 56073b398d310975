//! MCP (Model Context Protocol) Server
//!
//! Session-scoped MCP gateway in front of the Mist API. Every connection gets
//! a session that starts with the essential tools only; agents enable tool
//! categories on demand, and write tools are gated by the consent protocol.
//!
//! ## Architecture
//!
//! - Transports: WebSocket at `/mcp` and newline-delimited stdio
//! - Dispatch: single interception point ([`dispatcher::ToolDispatcher`])
//! - Tools: catalog pass-through, capability management, write tools

pub mod connection;
pub mod context;
pub mod dispatcher;
pub mod gatekeeper;
pub mod handler;
pub mod protocol;
pub mod registry;
pub mod stdio;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{create_mcp_state, McpConnection, McpSettings, McpState};
pub use context::{ClientPeer, ToolContext};
pub use handler::mcp_handler;
pub use protocol::{McpError, McpRequest, McpResponse};
pub use registry::McpRegistry;
