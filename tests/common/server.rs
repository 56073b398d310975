//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own session registry and
//! upstream stub.

use super::constants::*;
use super::fixtures::StubUpstream;
use mist_mcp_gateway::consent::ConsentPolicy;
use mist_mcp_gateway::mcp::{create_mcp_state, McpSettings};
use mist_mcp_gateway::server::{make_app, RequestsLoggingLevel, ServerConfig, ServerState};
use mist_mcp_gateway::session::{SessionRegistry, SessionSettings, TransportKind};
use mist_mcp_gateway::CapabilityCatalog;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Knobs for a test server. The defaults mirror the production defaults.
#[derive(Clone)]
pub struct TestServerOptions {
    pub enable_write_tools: bool,
    pub disable_elicitation: bool,
    pub default_mode: String,
    pub admin_token: Option<String>,
    pub idle_timeout: Duration,
    pub cleanup_interval: Duration,
    pub consent_timeout: Duration,
}

impl Default for TestServerOptions {
    fn default() -> Self {
        Self {
            enable_write_tools: false,
            disable_elicitation: false,
            default_mode: "managed".to_string(),
            admin_token: None,
            idle_timeout: Duration::from_secs(60 * 60),
            cleanup_interval: Duration::from_secs(5 * 60),
            consent_timeout: Duration::from_secs(5),
        }
    }
}

/// Test server instance with an isolated session registry
///
/// When dropped, the server gracefully shuts down and the cleanup task stops.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Session registry for direct inspection in tests
    pub sessions: Arc<SessionRegistry>,

    /// Upstream stub recording every forwarded call
    pub upstream: Arc<StubUpstream>,

    shutdown: CancellationToken,
}

#[allow(dead_code)]
impl TestServer {
    /// Spawns a new test server with default options on a random port
    pub async fn spawn() -> Self {
        Self::spawn_with(TestServerOptions::default()).await
    }

    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if port binding fails or the server doesn't become ready
    /// within the timeout.
    pub async fn spawn_with(options: TestServerOptions) -> Self {
        let catalog = Arc::new(CapabilityCatalog::builtin());
        let shutdown = CancellationToken::new();
        let sessions = SessionRegistry::new(
            &SessionSettings {
                idle_timeout: options.idle_timeout,
                cleanup_interval: options.cleanup_interval,
            },
            catalog.essential_tools(),
            shutdown.clone(),
        );
        let upstream = Arc::new(StubUpstream::default());

        let mcp_state = create_mcp_state(
            catalog,
            sessions.clone(),
            upstream.clone(),
            McpSettings {
                transport: TransportKind::Http,
                default_mode: options.default_mode.clone(),
                consent_policy: ConsentPolicy {
                    enable_write_tools: options.enable_write_tools,
                    disable_elicitation: options.disable_elicitation,
                },
                consent_timeout: options.consent_timeout,
            },
        );

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            host: "127.0.0.1".to_string(),
            port,
            metrics_port: 0,
            admin_token: options.admin_token.clone(),
        };
        let app = make_app(ServerState::new(config, Arc::new(mcp_state)));

        // Spawn server in background task with graceful shutdown
        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
            .await
            .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            sessions,
            upstream,
            shutdown,
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the status endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!("Server did not become ready within {:?}", timeout);
            }

            if let Ok(response) = client.get(&self.base_url).send().await {
                if response.status().is_success() {
                    return;
                }
            }

            tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
        }
    }

    /// WebSocket URL of the MCP endpoint
    pub fn mcp_url(&self) -> String {
        self.base_url.replace("http://", "ws://") + "/mcp"
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.sessions.shutdown();
    }
}
