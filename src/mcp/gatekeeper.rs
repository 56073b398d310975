//! Per-call capability check.

use std::sync::Arc;

use super::registry::RegisteredTool;
use crate::catalog::CapabilityCatalog;
use crate::error::{GatewayError, ToolRejection};
use crate::session::Session;

/// Decides whether a session may call a tool. Pure read of the session
/// snapshot; it never mutates anything.
pub struct ToolGatekeeper {
    catalog: Arc<CapabilityCatalog>,
}

impl ToolGatekeeper {
    pub fn new(catalog: Arc<CapabilityCatalog>) -> Self {
        Self { catalog }
    }

    pub fn check(&self, session: &Session, tool: &RegisteredTool) -> Result<(), GatewayError> {
        if self.catalog.is_essential(&tool.name) {
            return Ok(());
        }

        if tool.is_write() {
            return if session.write_access.is_unlocked() {
                Ok(())
            } else {
                Err(GatewayError::ToolDisabled(ToolRejection::write_locked(
                    &tool.name,
                )))
            };
        }

        if session.is_all_tools_mode() || session.enabled_tools.contains(&tool.name) {
            Ok(())
        } else {
            Err(GatewayError::ToolDisabled(ToolRejection::not_enabled(
                &tool.name,
            )))
        }
    }

    pub fn is_visible(&self, session: &Session, tool: &RegisteredTool) -> bool {
        self.check(session, tool).is_ok()
    }
}
