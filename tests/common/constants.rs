//! Shared constants for end-to-end tests
//!
//! When the built-in catalog or the tool names change, update only this file.

// ============================================================================
// Tools
// ============================================================================

/// Essential tool returning the token owner's identity
pub const GET_SELF: &str = "getSelf";

/// Essential capability management tool
pub const MANAGE_TOOLS: &str = "manageMcpTools";

/// Tool of the "sites" category
pub const SITES_TOOL: &str = "getSiteInfo";

/// Tool of the "orgs" category
pub const ORGS_TOOL: &str = "getOrg";

/// Write tool acting on site objects
pub const UPDATE_SITE_OBJECTS: &str = "updateSiteConfigurationObjects";

/// Write tool acting on org objects
pub const CHANGE_ORG_OBJECTS: &str = "changeOrgConfigurationObjects";

// ============================================================================
// Identifiers
// ============================================================================

pub const SITE_ID: &str = "4ac1dcf4-9d8b-7211-65c4-057819f0862b";

pub const ORG_ID: &str = "9777c1a0-6ef6-11e6-8bbf-02e208b2d34f";

/// Bearer token for the admin routes
pub const ADMIN_TOKEN: &str = "test-admin-token";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Timeout for a single MCP response (seconds)
pub const RESPONSE_TIMEOUT_SECS: u64 = 10;
