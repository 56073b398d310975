//! Mist MCP Gateway Library
//!
//! Session-scoped MCP gateway: per-connection tool capabilities, on-demand
//! category enabling and consent-gated write tools. The modules are exposed
//! for the binary and the end-to-end tests.

pub mod catalog;
pub mod config;
pub mod consent;
pub mod error;
pub mod mcp;
pub mod server;
pub mod session;
pub mod upstream;

// Re-export commonly used types for convenience
pub use catalog::CapabilityCatalog;
pub use error::GatewayError;
pub use server::{run_server, RequestsLoggingLevel};
pub use session::{SessionRegistry, TransportKind};
