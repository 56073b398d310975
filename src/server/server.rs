use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::admin::make_admin_routes;
use super::metrics::metrics_handler;
use super::{log_requests, state::*};
use crate::mcp::connection::{server_version, SERVER_NAME};
use crate::mcp::mcp_handler;

#[derive(Serialize)]
struct ServerStats {
    pub name: &'static str,
    pub version: String,
    pub uptime: String,
    pub active_sessions: usize,
    pub registered_tools: usize,
    pub write_tools_enabled: bool,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let registry = state.mcp_state.dispatcher.registry();
    let stats = ServerStats {
        name: SERVER_NAME,
        version: server_version(),
        uptime: format_uptime(state.start_time.elapsed()),
        active_sessions: state.sessions.len().await,
        registered_tools: registry.tool_count(),
        write_tools_enabled: registry.write_tool_count() > 0,
    };
    Json(stats)
}

pub fn make_app(state: ServerState) -> Router {
    let mut app: Router = Router::new()
        .route("/", get(home))
        .route("/mcp", get(mcp_handler))
        .with_state(state.clone());

    if let Some(token) = state.config.admin_token.clone() {
        info!("Admin routes enabled at /admin");
        app = app.nest("/admin", make_admin_routes(state.clone(), token));
    }

    app.layer(middleware::from_fn_with_state(state, log_requests))
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

async fn run_metrics_server(listener: tokio::net::TcpListener, shutdown: CancellationToken) {
    let result = axum::serve(listener, make_metrics_app())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;
    if let Err(e) = result {
        error!("Metrics server failed: {}", e);
    }
}

pub async fn run_server(state: ServerState, shutdown: CancellationToken) -> Result<()> {
    let config = state.config.clone();

    if config.metrics_port != 0 {
        let metrics_addr = format!("{}:{}", config.host, config.metrics_port);
        let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
            .await
            .with_context(|| format!("Failed to bind metrics listener on {}", metrics_addr))?;
        info!("Metrics available at http://{}/metrics", metrics_addr);
        tokio::spawn(run_metrics_server(metrics_listener, shutdown.clone()));
    }

    let app = make_app(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Ready to serve MCP at ws://{}/mcp", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await?;

    info!("HTTP server stopped");
    Ok(())
}
