//! MCP Tool Execution Context
//!
//! Everything a tool handler may touch: the resolved session, the shared
//! registry and catalog, the upstream client, and the connected client.

use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::CapabilityCatalog;
use crate::consent::{ConsentDecision, ConsentError};
use crate::session::{Session, SessionIdentity, SessionRegistry};
use crate::upstream::UpstreamClient;

/// Outbound side of one client connection.
#[async_trait]
pub trait ClientPeer: Send + Sync {
    /// Tells the client its tool list changed.
    async fn notify_tools_list_changed(&self) -> anyhow::Result<()>;

    /// Asks the client to confirm an action.
    async fn request_consent(&self, message: &str) -> Result<ConsentDecision, ConsentError>;
}

/// Context provided to tool handlers during execution
#[derive(Clone)]
pub struct ToolContext {
    pub identity: SessionIdentity,

    /// Snapshot of the session taken when the call was dispatched
    pub session: Session,

    pub sessions: Arc<SessionRegistry>,
    pub catalog: Arc<CapabilityCatalog>,
    pub upstream: Arc<dyn UpstreamClient>,
    pub peer: Arc<dyn ClientPeer>,
}

impl ToolContext {
    pub fn session_id(&self) -> &str {
        &self.session.id
    }
}
