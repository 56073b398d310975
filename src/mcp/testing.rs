//! Test doubles shared by the MCP unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::context::{ClientPeer, ToolContext};
use crate::catalog::CapabilityCatalog;
use crate::consent::{ConsentDecision, ConsentError};
use crate::session::{
    ConnectionContext, SessionIdentity, SessionRegistry, SessionSettings, TransportKind,
};
use crate::upstream::{UpstreamClient, UpstreamError};

/// Peer that records what the server sent and answers consent with a fixed reply.
pub(crate) struct RecordingPeer {
    pub notifications: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
    reply: Result<ConsentDecision, ConsentError>,
    fail_notifications: bool,
}

impl RecordingPeer {
    pub fn answering(decision: ConsentDecision) -> Self {
        Self {
            notifications: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            reply: Ok(decision),
            fail_notifications: false,
        }
    }

    pub fn unsupported() -> Self {
        Self {
            reply: Err(ConsentError::Unsupported("Method not found".to_string())),
            ..Self::answering(ConsentDecision::Cancel)
        }
    }

    pub fn broken_notifications() -> Self {
        Self {
            fail_notifications: true,
            ..Self::answering(ConsentDecision::Accept)
        }
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClientPeer for RecordingPeer {
    async fn notify_tools_list_changed(&self) -> anyhow::Result<()> {
        if self.fail_notifications {
            bail!("connection closed");
        }
        self.notifications.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn request_consent(&self, message: &str) -> Result<ConsentDecision, ConsentError> {
        self.prompts.lock().unwrap().push(message.to_string());
        self.reply.clone()
    }
}

/// Upstream that records every call and echoes it back.
#[derive(Default)]
pub(crate) struct CountingUpstream {
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl CountingUpstream {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl UpstreamClient for CountingUpstream {
    async fn call(&self, operation: &str, arguments: Value) -> Result<Value, UpstreamError> {
        self.calls
            .lock()
            .unwrap()
            .push((operation.to_string(), arguments.clone()));
        Ok(json!({ "operation": operation, "arguments": arguments }))
    }
}

/// Isolated catalog, registry, upstream and peer for one test.
pub(crate) struct Fixture {
    pub catalog: Arc<CapabilityCatalog>,
    pub sessions: Arc<SessionRegistry>,
    pub upstream: Arc<CountingUpstream>,
    pub peer: Arc<RecordingPeer>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_peer(RecordingPeer::answering(ConsentDecision::Accept))
    }

    pub fn with_peer(peer: RecordingPeer) -> Self {
        let catalog = Arc::new(CapabilityCatalog::builtin());
        let sessions = SessionRegistry::new(
            &SessionSettings::default(),
            catalog.essential_tools(),
            CancellationToken::new(),
        );
        Self {
            catalog,
            sessions,
            upstream: Arc::new(CountingUpstream::default()),
            peer: Arc::new(peer),
        }
    }

    pub fn identity(host: &str, port: u16, mode: &str) -> SessionIdentity {
        let mut ctx = ConnectionContext::network(
            format!("{}:{}", host, port)
                .parse()
                .expect("valid test address"),
        );
        ctx.requested_mode = Some(mode.to_string());
        SessionIdentity::resolve(TransportKind::Http, Some(&ctx), "managed")
            .expect("network identity")
    }

    pub async fn context(&self, identity: &SessionIdentity) -> ToolContext {
        let session = self.sessions.get_or_create(identity).await;
        ToolContext {
            identity: identity.clone(),
            session,
            sessions: self.sessions.clone(),
            catalog: self.catalog.clone(),
            upstream: self.upstream.clone(),
            peer: self.peer.clone(),
        }
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        self.sessions.shutdown();
    }
}
