//! Per-call consent exchange.
//!
//! A consent request is an outbound `elicitation/create` JSON-RPC request
//! correlated with the client's response by request id. The caller awaits a
//! oneshot that the connection's reader completes when the matching response
//! arrives. Timeouts, connection teardown and dropped senders all resolve to
//! [`ConsentDecision::Cancel`].

use super::ConsentDecision;
use crate::mcp::protocol::{methods, McpOutbound, RequestId};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

/// Response received from the client for a consent request.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsentReply {
    Result(Value),
    Error(Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsentError {
    #[error("Client could not service the consent request: {0}")]
    Unsupported(String),
}

pub struct ConsentBroker {
    outbound: mpsc::Sender<McpOutbound>,
    pending: Mutex<HashMap<RequestId, oneshot::Sender<ConsentReply>>>,
    timeout: Duration,
    closed: CancellationToken,
}

impl ConsentBroker {
    pub fn new(outbound: mpsc::Sender<McpOutbound>, timeout: Duration) -> Self {
        Self {
            outbound,
            pending: Mutex::new(HashMap::new()),
            timeout,
            closed: CancellationToken::new(),
        }
    }

    /// Asks the client to confirm an action and waits for the decision.
    pub async fn request(&self, message: &str) -> Result<ConsentDecision, ConsentError> {
        if self.closed.is_cancelled() {
            return Ok(ConsentDecision::Cancel);
        }

        let id = RequestId::String(format!("consent-{}", Uuid::new_v4()));
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        let request = McpOutbound::request(
            id.clone(),
            methods::ELICITATION_CREATE,
            json!({
                "message": message,
                "requestedSchema": { "type": "object", "properties": {} },
            }),
        );

        if self.outbound.send(request).await.is_err() {
            self.pending.lock().await.remove(&id);
            debug!("Consent request {:?} not sent, connection is gone", id);
            return Ok(ConsentDecision::Cancel);
        }

        let outcome = tokio::select! {
            reply = rx => match reply {
                Ok(ConsentReply::Result(result)) => Ok(ConsentDecision::from_action(
                    result.get("action").and_then(Value::as_str),
                )),
                Ok(ConsentReply::Error(error)) => Err(ConsentError::Unsupported(error.to_string())),
                Err(_) => Ok(ConsentDecision::Cancel),
            },
            _ = tokio::time::sleep(self.timeout) => {
                warn!("Consent request {:?} timed out after {:?}", id, self.timeout);
                Ok(ConsentDecision::Cancel)
            }
            _ = self.closed.cancelled() => Ok(ConsentDecision::Cancel),
        };

        self.pending.lock().await.remove(&id);
        outcome
    }

    /// Routes a client response to the waiting request. Returns false when no
    /// consent request with that id is pending.
    pub async fn resolve(&self, id: &RequestId, reply: ConsentReply) -> bool {
        match self.pending.lock().await.remove(id) {
            Some(tx) => tx.send(reply).is_ok(),
            None => false,
        }
    }

    /// Resolves every pending and future request to cancel.
    pub async fn close(&self) {
        self.closed.cancel();
        self.pending.lock().await.clear();
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
