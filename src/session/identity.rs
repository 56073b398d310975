//! Session identity resolution.

use crate::error::GatewayError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::net::SocketAddr;

/// Host and port used for connectionless transports.
pub const STDIO_SENTINEL: &str = "stdio";

pub const DEFAULT_TOOLS_MODE: &str = "managed";

/// Mode in which every catalog tool is callable without enabling categories.
pub const ALL_TOOLS_MODE: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Stdio,
    Http,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Stdio => write!(f, "stdio"),
            TransportKind::Http => write!(f, "http"),
        }
    }
}

/// What the transport knows about the peer of one connection.
#[derive(Debug, Clone, Default)]
pub struct ConnectionContext {
    pub peer: Option<SocketAddr>,
    pub requested_mode: Option<String>,
    /// Explicit request to unlock write tools without per-call consent.
    pub write_override: bool,
    /// Categories to enable as soon as the session is established.
    pub preset_categories: Option<String>,
}

impl ConnectionContext {
    pub fn network(peer: SocketAddr) -> Self {
        Self {
            peer: Some(peer),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SessionIdentity {
    pub host: String,
    pub port: String,
    pub mode: String,
}

impl SessionIdentity {
    /// Resolves the identity of a connection.
    ///
    /// Connectionless transports always map to the sentinel triple. Networked
    /// transports need a peer address; without one this fails instead of
    /// falling back to a shared identity, which would merge unrelated clients
    /// into one session.
    pub fn resolve(
        transport: TransportKind,
        context: Option<&ConnectionContext>,
        default_mode: &str,
    ) -> Result<Self, GatewayError> {
        match transport {
            TransportKind::Stdio => Ok(Self::stdio(default_mode)),
            TransportKind::Http => {
                let context = context.ok_or_else(|| GatewayError::MissingContext {
                    transport: transport.to_string(),
                })?;
                let peer = context.peer.ok_or_else(|| GatewayError::MissingContext {
                    transport: transport.to_string(),
                })?;
                let mode = context
                    .requested_mode
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(default_mode);

                Ok(Self {
                    host: peer.ip().to_string(),
                    port: peer.port().to_string(),
                    mode: mode.to_string(),
                })
            }
        }
    }

    pub fn stdio(default_mode: &str) -> Self {
        Self {
            host: STDIO_SENTINEL.to_string(),
            port: STDIO_SENTINEL.to_string(),
            mode: default_mode.to_string(),
        }
    }

    /// Lowercase hex SHA-256 of `session_{host}:{port}|tools_mode={mode}`.
    pub fn session_id(&self) -> String {
        let key = format!(
            "session_{}:{}|tools_mode={}",
            self.host, self.port, self.mode
        );
        format!("{:x}", Sha256::digest(key.as_bytes()))
    }

    pub fn is_all_tools_mode(&self) -> bool {
        self.mode == ALL_TOOLS_MODE
    }
}
