//! Consent gate for write tools.
//!
//! Write access is decided once per session during the handshake
//! ([`ConsentPolicy::evaluate`]). When the unlock came from the client's
//! elicitation capability, every write call additionally goes through a
//! per-call exchange handled by [`ConsentBroker`].

mod broker;

pub use broker::{ConsentBroker, ConsentError, ConsentReply};

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentDecision {
    Accept,
    Decline,
    Cancel,
}

impl ConsentDecision {
    /// Parses an elicitation `action`. Anything unrecognised counts as cancel.
    pub fn from_action(action: Option<&str>) -> Self {
        match action.map(str::to_ascii_lowercase).as_deref() {
            Some("accept") => ConsentDecision::Accept,
            Some("decline") => ConsentDecision::Decline,
            _ => ConsentDecision::Cancel,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentDecision::Accept => "accept",
            ConsentDecision::Decline => "decline",
            ConsentDecision::Cancel => "cancel",
        }
    }
}

impl fmt::Display for ConsentDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write access of a session, fixed at handshake time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteAccess {
    #[default]
    Locked,
    /// Unlocked because the client can answer consent requests; every write
    /// call asks first.
    ConsentRequired,
    /// Unlocked by an explicit override; write calls proceed directly.
    Unrestricted,
}

impl WriteAccess {
    pub fn is_unlocked(&self) -> bool {
        !matches!(self, WriteAccess::Locked)
    }
}

/// What the handshake revealed about the client and its transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandshakeSignals {
    pub supports_elicitation: bool,
    pub write_override: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsentPolicy {
    pub enable_write_tools: bool,
    pub disable_elicitation: bool,
}

impl ConsentPolicy {
    pub fn evaluate(&self, signals: HandshakeSignals) -> WriteAccess {
        if signals.write_override {
            debug!("Write override signal present, write tools unlocked without consent");
            return WriteAccess::Unrestricted;
        }
        if self.enable_write_tools && self.disable_elicitation {
            warn!(
                "Both enable_write_tools and disable_elicitation are set: write tools are unlocked \
                 without any consent safeguard"
            );
            return WriteAccess::Unrestricted;
        }
        if signals.supports_elicitation {
            debug!("Client supports elicitation, write tools unlocked with per-call consent");
            return WriteAccess::ConsentRequired;
        }
        debug!("No elicitation support and no override, write tools stay locked");
        WriteAccess::Locked
    }
}
