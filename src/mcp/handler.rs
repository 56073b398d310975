//! MCP WebSocket Handler
//!
//! Handles WebSocket connections for MCP protocol.

use std::net::SocketAddr;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::connection::{McpConnection, OUTBOUND_BUFFER};
use super::protocol::McpOutbound;
use crate::server::state::GuardedMcpState;
use crate::session::ConnectionContext;

/// Header that unlocks write tools without per-call consent.
pub const DISABLE_ELICITATION_HEADER: &str = "x-disable-elicitation";

/// Query parameters accepted on the MCP endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct McpConnectParams {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub disable_elicitation: Option<String>,
    /// Comma-separated categories enabled right after the handshake.
    #[serde(default)]
    pub categories: Option<String>,
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

/// Builds the connection context from what the upgrade request carried.
pub fn connection_context(
    peer: SocketAddr,
    params: McpConnectParams,
    headers: &HeaderMap,
) -> ConnectionContext {
    let header_override = headers
        .get(DISABLE_ELICITATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(is_truthy);
    let query_override = params
        .disable_elicitation
        .as_deref()
        .is_some_and(is_truthy);

    ConnectionContext {
        peer: Some(peer),
        requested_mode: params.mode,
        write_override: header_override || query_override,
        preset_categories: params.categories.filter(|c| !c.trim().is_empty()),
    }
}

/// WebSocket upgrade handler for MCP
pub async fn mcp_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(params): Query<McpConnectParams>,
    headers: HeaderMap,
    State(mcp_state): State<GuardedMcpState>,
) -> Response {
    let context = connection_context(peer, params, &headers);
    info!(
        "MCP WebSocket upgrade from {} (mode {:?}, write override {})",
        peer, context.requested_mode, context.write_override
    );

    ws.on_upgrade(move |socket| handle_mcp_socket(socket, context, mcp_state))
}

/// Handle an established MCP WebSocket connection
async fn handle_mcp_socket(
    socket: WebSocket,
    context: ConnectionContext,
    mcp_state: GuardedMcpState,
) {
    let peer = context.peer;
    debug!("MCP connection established for {:?}", peer);

    let (ws_sink, mut ws_stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
    let connection = McpConnection::new(mcp_state, Some(context), outbound_tx);

    let outgoing_handle = tokio::spawn(forward_outgoing(ws_sink, outbound_rx));

    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                connection.handle_text(text.as_str()).await;
            }
            Ok(Message::Binary(_)) => {
                debug!("Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                // Axum/tungstenite handles pong automatically
            }
            Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                debug!("Received close frame");
                break;
            }
            Err(e) => {
                debug!("WebSocket error: {}", e);
                break;
            }
        }
    }

    connection.close().await;
    outgoing_handle.abort();
    debug!("MCP connection closed for {:?}", peer);
}

/// Forward messages from the outbound channel to the WebSocket.
async fn forward_outgoing(
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<McpOutbound>,
) {
    while let Some(message) = outbound_rx.recv().await {
        match serde_json::to_string(&message) {
            Ok(json) => {
                if ws_sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                error!("Failed to serialize MCP message: {}", e);
            }
        }
    }
}
