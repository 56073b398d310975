//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{McpTestClient, TestServer};
//!
//! #[tokio::test]
//! async fn test_list_tools() {
//!     let server = TestServer::spawn().await;
//!     let mut client = McpTestClient::connect(&server.base_url).await;
//!     client.initialize(false).await;
//!
//!     let tools = client.list_tools().await;
//!     assert!(tools.contains(&"getSelf".to_string()));
//! }
//! ```

mod client;
mod constants;
mod fixtures;
mod server;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use client::{ConsentAnswer, McpTestClient};
#[allow(unused_imports)]
pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::StubUpstream;
#[allow(unused_imports)]
pub use server::{TestServer, TestServerOptions};
