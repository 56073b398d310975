//! MCP over stdio
//!
//! Newline-delimited JSON-RPC on stdin/stdout. There is exactly one
//! connection, and it maps to the sentinel session identity.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::connection::{McpConnection, OUTBOUND_BUFFER};
use super::protocol::{McpError, McpOutbound};
use crate::server::state::GuardedMcpState;
use crate::session::ConnectionContext;

/// Serves MCP on the process's stdin and stdout until stdin closes or
/// `shutdown` is cancelled.
pub async fn run_stdio(
    mcp_state: GuardedMcpState,
    write_override: bool,
    shutdown: CancellationToken,
) -> Result<()> {
    info!("Serving MCP over stdio");
    serve(
        tokio::io::stdin(),
        tokio::io::stdout(),
        mcp_state,
        write_override,
        shutdown,
    )
    .await
}

/// Drives one connection over any line-oriented reader and writer.
pub async fn serve<R, W>(
    reader: R,
    writer: W,
    mcp_state: GuardedMcpState,
    write_override: bool,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let context = ConnectionContext {
        write_override,
        ..Default::default()
    };
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
    let connection = McpConnection::new(mcp_state, Some(context), outbound_tx);
    let writer_handle = tokio::spawn(write_outgoing(writer, outbound_rx));

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let result = loop {
        buf.clear();
        let read = tokio::select! {
            read = reader.read_until(b'\n', &mut buf) => read,
            _ = shutdown.cancelled() => {
                debug!("Stdio transport received shutdown signal");
                break Ok(());
            }
        };

        match read.context("Failed to read from stdin") {
            Ok(0) => {
                debug!("Stdin closed");
                break Ok(());
            }
            Ok(_) => match std::str::from_utf8(&buf) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        connection.handle_text(line).await;
                    }
                }
                Err(e) => {
                    warn!("Rejecting non UTF-8 line on stdin: {}", e);
                    connection
                        .reject_malformed(McpError::ParseError(e.to_string()))
                        .await;
                }
            },
            Err(e) => break Err(e),
        }
    };

    connection.close().await;
    // Dropping the connection closes the outbound channel once in-flight
    // requests are done, which lets the writer drain and exit.
    drop(connection);
    if let Err(e) = writer_handle.await {
        error!("Stdio writer task failed: {}", e);
    }
    result
}

async fn write_outgoing<W>(mut writer: W, mut outbound_rx: mpsc::Receiver<McpOutbound>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outbound_rx.recv().await {
        let mut line = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize MCP message: {}", e);
                continue;
            }
        };
        line.push('\n');
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            error!("Failed to write to stdout: {}", e);
            break;
        }
        if let Err(e) = writer.flush().await {
            error!("Failed to flush stdout: {}", e);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CapabilityCatalog;
    use crate::consent::ConsentPolicy;
    use crate::mcp::connection::{create_mcp_state, McpSettings};
    use crate::session::{SessionRegistry, SessionSettings, TransportKind};
    use crate::upstream::UnconfiguredUpstream;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::duplex;

    fn stdio_state() -> GuardedMcpState {
        let catalog = Arc::new(CapabilityCatalog::builtin());
        let sessions = SessionRegistry::new(
            &SessionSettings::default(),
            catalog.essential_tools(),
            CancellationToken::new(),
        );
        Arc::new(create_mcp_state(
            catalog,
            sessions,
            Arc::new(UnconfiguredUpstream),
            McpSettings {
                transport: TransportKind::Stdio,
                default_mode: "managed".to_string(),
                consent_policy: ConsentPolicy::default(),
                consent_timeout: Duration::from_secs(5),
            },
        ))
    }

    #[tokio::test]
    async fn test_stdio_roundtrip() {
        let state = stdio_state();
        let (mut client_in, server_in) = duplex(4096);
        let (server_out, client_out) = duplex(4096);

        let server = tokio::spawn(serve(
            server_in,
            server_out,
            state.clone(),
            false,
            CancellationToken::new(),
        ));

        client_in
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n")
            .await
            .unwrap();
        drop(client_in);

        server.await.unwrap().unwrap();

        let mut lines = BufReader::new(client_out).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let response: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(response["id"], 1);
        assert!(response["result"].is_object());

        state.sessions.shutdown();
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_gets_parse_error_and_serving_continues() {
        let state = stdio_state();
        let (mut client_in, server_in) = duplex(4096);
        let (server_out, client_out) = duplex(4096);

        let server = tokio::spawn(serve(
            server_in,
            server_out,
            state.clone(),
            false,
            CancellationToken::new(),
        ));

        client_in.write_all(b"\xff\xfe\n").await.unwrap();
        client_in
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"ping\"}\n")
            .await
            .unwrap();

        let mut lines = BufReader::new(client_out).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let rejection: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(rejection["error"]["code"], -32700);
        assert!(rejection["id"].is_null());

        let line = lines.next_line().await.unwrap().unwrap();
        let response: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(response["id"], 7);
        assert!(response["result"].is_object());

        drop(client_in);
        server.await.unwrap().unwrap();
        state.sessions.shutdown();
    }
}
