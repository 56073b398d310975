//! Transport-agnostic MCP connection driver.
//!
//! A transport feeds inbound text frames to [`McpConnection::handle_text`]
//! and drains the outbound channel to its socket. Each request runs in its
//! own task, so a tool call waiting on a consent exchange never blocks the
//! reader that has to deliver the consent response.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};

use super::context::{ClientPeer, ToolContext};
use super::dispatcher::ToolDispatcher;
use super::protocol::{
    methods, InitializeParams, InitializeResult, McpError, McpIncoming, McpOutbound, McpRequest,
    McpResponse, PingResult, ServerCapabilities, ServerInfo, ToolsCallParams, ToolsCallResult,
    ToolsCapability, ToolsListResult, MCP_PROTOCOL_VERSION,
};
use super::registry::McpRegistry;
use super::tools::{enable_categories, register_all_tools};
use crate::catalog::{CapabilityCatalog, CategoryRequest};
use crate::consent::{
    ConsentBroker, ConsentDecision, ConsentError, ConsentPolicy, ConsentReply, HandshakeSignals,
    WriteAccess,
};
use crate::error::GatewayError;
use crate::session::{
    ConnectionContext, Session, SessionIdentity, SessionRegistry, TransportKind,
};
use crate::upstream::UpstreamClient;

pub const SERVER_NAME: &str = "mist-mcp-gateway";

const INSTRUCTIONS: &str = "Only the essential tools are available at first. Call manageMcpTools \
with list_available_categories=true to see the tool categories, then enable the ones you need \
with enable_mcp_tools_categories.";

/// Outbound queue depth per connection.
pub const OUTBOUND_BUFFER: usize = 64;

pub fn server_version() -> String {
    format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("GIT_HASH"))
}

/// Gateway settings that apply to every connection.
#[derive(Debug, Clone)]
pub struct McpSettings {
    pub transport: TransportKind,
    pub default_mode: String,
    pub consent_policy: ConsentPolicy,
    pub consent_timeout: Duration,
}

/// State shared across MCP connections
pub struct McpState {
    pub dispatcher: ToolDispatcher,
    pub catalog: Arc<CapabilityCatalog>,
    pub sessions: Arc<SessionRegistry>,
    pub upstream: Arc<dyn UpstreamClient>,
    pub settings: McpSettings,
    pub start_time: Instant,
}

/// Create the MCP state with registered tools
pub fn create_mcp_state(
    catalog: Arc<CapabilityCatalog>,
    sessions: Arc<SessionRegistry>,
    upstream: Arc<dyn UpstreamClient>,
    settings: McpSettings,
) -> McpState {
    let mut registry = McpRegistry::new();
    register_all_tools(
        &mut registry,
        &catalog,
        settings.consent_policy.enable_write_tools,
    );

    info!(
        "MCP registry initialized with {} tools ({} write tools)",
        registry.tool_count(),
        registry.write_tool_count()
    );

    McpState {
        dispatcher: ToolDispatcher::new(registry, catalog.clone()),
        catalog,
        sessions,
        upstream,
        settings,
        start_time: Instant::now(),
    }
}

/// Server-to-client side of one connection.
struct ConnectionPeer {
    outbound: mpsc::Sender<McpOutbound>,
    broker: Arc<ConsentBroker>,
}

#[async_trait]
impl ClientPeer for ConnectionPeer {
    async fn notify_tools_list_changed(&self) -> anyhow::Result<()> {
        self.outbound
            .send(McpOutbound::notification(methods::TOOLS_LIST_CHANGED))
            .await
            .map_err(|_| anyhow::anyhow!("connection closed"))
    }

    async fn request_consent(&self, message: &str) -> Result<ConsentDecision, ConsentError> {
        self.broker.request(message).await
    }
}

pub struct McpConnection {
    state: Arc<McpState>,
    context: ConnectionContext,
    /// Resolved once; a failure is reported on every request that needs it.
    identity: Result<SessionIdentity, GatewayError>,
    outbound: mpsc::Sender<McpOutbound>,
    broker: Arc<ConsentBroker>,
    peer: Arc<ConnectionPeer>,
    initialized: AtomicBool,
    /// Access negotiated by the last `initialize`.
    write_access: RwLock<WriteAccess>,
}

impl McpConnection {
    pub fn new(
        state: Arc<McpState>,
        context: Option<ConnectionContext>,
        outbound: mpsc::Sender<McpOutbound>,
    ) -> Arc<Self> {
        let identity = SessionIdentity::resolve(
            state.settings.transport,
            context.as_ref(),
            &state.settings.default_mode,
        );
        if let Err(e) = &identity {
            warn!("Connection without usable identity: {}", e);
        }

        let broker = Arc::new(ConsentBroker::new(
            outbound.clone(),
            state.settings.consent_timeout,
        ));
        let peer = Arc::new(ConnectionPeer {
            outbound: outbound.clone(),
            broker: broker.clone(),
        });

        Arc::new(Self {
            state,
            context: context.unwrap_or_default(),
            identity,
            outbound,
            broker,
            peer,
            initialized: AtomicBool::new(false),
            write_access: RwLock::new(WriteAccess::default()),
        })
    }

    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.identity.as_ref().ok()
    }

    /// Handles one inbound frame.
    pub async fn handle_text(self: &Arc<Self>, text: &str) {
        match McpIncoming::parse(text) {
            Ok(McpIncoming::Request(request)) => {
                let connection = self.clone();
                tokio::spawn(async move {
                    let response = connection.handle_request(request).await;
                    connection.send(response.into()).await;
                });
            }
            Ok(McpIncoming::Response { id, outcome }) => {
                let reply = match outcome {
                    Ok(result) => ConsentReply::Result(result),
                    Err(error) => ConsentReply::Error(error),
                };
                if !self.broker.resolve(&id, reply).await {
                    debug!("Dropping response to unknown request {:?}", id);
                }
            }
            Ok(McpIncoming::Notification { method, .. }) => {
                debug!("Received notification {}", method);
            }
            Err(e) => self.reject_malformed(e).await,
        }
    }

    /// Answers a frame that could not be read as a message. There is no id
    /// to correlate with, so the error response carries a null id.
    pub async fn reject_malformed(&self, error: McpError) {
        debug!("Rejecting malformed message: {}", error.message());
        self.send(McpResponse::error(None, error).into()).await;
    }

    /// Resolves pending consent exchanges to cancel.
    pub async fn close(&self) {
        self.broker.close().await;
        debug!("MCP connection closed");
    }

    async fn send(&self, message: McpOutbound) {
        if self.outbound.send(message).await.is_err() {
            debug!("Outbound channel closed, dropping message");
        }
    }

    async fn handle_request(&self, request: McpRequest) -> McpResponse {
        let request_id = request.id.clone();
        let result = match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(request.params).await,
            methods::PING => to_value(PingResult {}),
            methods::TOOLS_LIST => match self.require_initialized() {
                Ok(()) => self.handle_tools_list().await,
                Err(e) => Err(e),
            },
            methods::TOOLS_CALL => match self.require_initialized() {
                Ok(()) => self.handle_tools_call(request.params).await,
                Err(e) => Err(e),
            },
            other => Err(McpError::MethodNotFound(other.to_string())),
        };

        match result {
            Ok(value) => McpResponse::success(request_id, value),
            Err(error) => McpResponse::error(Some(request_id), error),
        }
    }

    fn require_initialized(&self) -> Result<(), McpError> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(McpError::NotInitialized)
        }
    }

    fn resolved_identity(&self) -> Result<&SessionIdentity, McpError> {
        self.identity.as_ref().map_err(|e| McpError::from(e.clone()))
    }

    async fn handle_initialize(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: InitializeParams = params
            .filter(|p| !p.is_null())
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .unwrap_or_default();

        let identity = self.resolved_identity()?;
        let sessions = &self.state.sessions;
        let session = sessions.get_or_create(identity).await;

        if let Some(client_info) = params.client_info {
            sessions.set_client_info(identity, client_info).await;
        }

        let signals = HandshakeSignals {
            supports_elicitation: params.capabilities.supports_elicitation(),
            write_override: self.context.write_override,
        };
        let write_access = self.state.settings.consent_policy.evaluate(signals);
        *self.write_access.write().await = write_access;
        sessions.set_write_access(identity, write_access).await;

        if let Some(preset) = self.context.preset_categories.as_deref() {
            let outcome = enable_categories(
                sessions,
                &self.state.catalog,
                identity,
                &CategoryRequest::One(preset.to_string()),
            )
            .await;
            debug!(
                "Preset categories {:?} enabled for session {}",
                outcome.newly_enabled, outcome.session.id
            );
        }

        self.initialized.store(true, Ordering::Release);
        info!(
            "MCP session {} initialized (mode {}, write access {:?}, protocol {})",
            session.id,
            identity.mode,
            write_access,
            params.protocol_version.as_deref().unwrap_or("unspecified")
        );

        to_value(InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(true),
                }),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: server_version(),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        })
    }

    /// The session behind this connection. If it was evicted while the
    /// connection stayed open, it comes back with the negotiated access.
    async fn session(&self, identity: &SessionIdentity) -> Session {
        let write_access = *self.write_access.read().await;
        self.state
            .sessions
            .get_or_restore(identity, write_access)
            .await
    }

    async fn handle_tools_list(&self) -> Result<Value, McpError> {
        let identity = self.resolved_identity()?;
        let session = self.session(identity).await;
        let tools = self.state.dispatcher.list_tools(&session);
        to_value(ToolsListResult { tools })
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: ToolsCallParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Missing params".to_string()))?;

        let identity = self.resolved_identity()?;
        let session = self.session(identity).await;
        let ctx = ToolContext {
            identity: identity.clone(),
            session,
            sessions: self.state.sessions.clone(),
            catalog: self.state.catalog.clone(),
            upstream: self.state.upstream.clone(),
            peer: self.peer.clone(),
        };

        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        let result = match self.state.dispatcher.call(ctx, &params.name, arguments).await {
            Ok(result) => result,
            // Capability and consent failures are returned as tool results so
            // the agent can read the payload and recover.
            Err(e) => match e.gateway_payload() {
                Some(payload) => ToolsCallResult::structured_error(payload),
                None => return Err(e),
            },
        };
        to_value(result)
    }
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|e| {
        error!("Failed to serialize MCP result: {}", e);
        McpError::InternalError(e.to_string())
    })
}
