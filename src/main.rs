use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::{fmt::Debug, path::PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mist_mcp_gateway::config::{AppConfig, CliConfig, FileConfig, API_TOKEN_ENV};
use mist_mcp_gateway::mcp::{create_mcp_state, stdio::run_stdio, McpSettings};
use mist_mcp_gateway::server::{metrics, run_server, ServerState};
use mist_mcp_gateway::upstream::{HttpUpstream, UnconfiguredUpstream, UpstreamClient};
use mist_mcp_gateway::{CapabilityCatalog, RequestsLoggingLevel, SessionRegistry, TransportKind};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[clap(version, about = "Session-scoped MCP gateway for the Mist API")]
struct CliArgs {
    /// Path to a TOML config file. Its values override the CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Transport to serve MCP on.
    #[clap(long, default_value = "stdio")]
    pub transport: TransportKind,

    /// The address to listen on (http transport).
    #[clap(long, default_value = "127.0.0.1")]
    pub host: String,

    /// The port to listen on (http transport).
    #[clap(short, long, default_value_t = 8000)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping). 0 disables it.
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Tools mode for connections that don't request one ("managed" or "all").
    #[clap(long, default_value = "managed")]
    pub default_mode: String,

    /// Minutes of inactivity after which a session is evicted.
    #[clap(long, default_value_t = 60)]
    pub session_timeout_minutes: u64,

    /// Seconds between idle-session sweeps.
    #[clap(long, default_value_t = 300)]
    pub cleanup_interval_secs: u64,

    /// Seconds to wait for the user's consent answer before canceling.
    #[clap(long, default_value_t = 300)]
    pub consent_timeout_secs: u64,

    /// Register the write tools.
    #[clap(long)]
    pub enable_write_tools: bool,

    /// Allow write tools without per-call consent.
    #[clap(long)]
    pub disable_elicitation: bool,

    /// Base URL of the upstream Mist API.
    #[clap(long)]
    pub upstream_url: Option<String>,

    /// Upstream API token. Falls back to the MIST_APITOKEN environment variable.
    #[clap(long)]
    pub upstream_token: Option<String>,

    /// Timeout in seconds for upstream requests.
    #[clap(long, default_value_t = 60)]
    pub upstream_timeout_sec: u64,

    /// JSON file with an alternative tool catalog.
    #[clap(long, value_parser = parse_path)]
    pub catalog_file: Option<PathBuf>,

    /// Bearer token for the /admin routes. Admin routes are disabled without it.
    #[clap(long)]
    pub admin_token: Option<String>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            transport: self.transport,
            host: self.host.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            default_mode: self.default_mode.clone(),
            session_timeout_minutes: self.session_timeout_minutes,
            cleanup_interval_secs: self.cleanup_interval_secs,
            consent_timeout_secs: self.consent_timeout_secs,
            enable_write_tools: self.enable_write_tools,
            disable_elicitation: self.disable_elicitation,
            upstream_url: self.upstream_url.clone(),
            upstream_token: self
                .upstream_token
                .clone()
                .or_else(|| std::env::var(API_TOKEN_ENV).ok()),
            upstream_timeout_sec: self.upstream_timeout_sec,
            catalog_file: self.catalog_file.clone(),
            admin_token: self.admin_token.clone(),
        }
    }
}

fn build_upstream(config: &AppConfig) -> Result<Arc<dyn UpstreamClient>> {
    match &config.upstream.url {
        Some(url) => {
            info!("Upstream API configured at {}", url);
            if config.upstream.token.is_none() {
                warn!("No upstream API token configured (set {})", API_TOKEN_ENV);
            }
            let client = HttpUpstream::new(
                url,
                config.upstream.token.as_deref(),
                config.upstream.timeout_sec,
            )?;
            Ok(Arc::new(client))
        }
        None => {
            warn!("No upstream URL configured; catalog tools will fail");
            Ok(Arc::new(UnconfiguredUpstream))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    // stdout carries the protocol on the stdio transport, so logs go to stderr.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    // Initialize metrics system
    info!("Initializing metrics...");
    metrics::init_metrics();

    let catalog = match &config.catalog_file {
        Some(path) => {
            info!("Loading tool catalog from {:?}...", path);
            CapabilityCatalog::load(path)?
        }
        None => CapabilityCatalog::builtin(),
    };
    let catalog = Arc::new(catalog);
    info!(
        "Catalog has {} categories and {} tools",
        catalog.categories().len(),
        catalog.all_tools().len()
    );

    let shutdown = CancellationToken::new();
    let sessions = SessionRegistry::new(
        &config.session,
        catalog.essential_tools(),
        shutdown.clone(),
    );
    let upstream = build_upstream(&config)?;

    let mcp_state = Arc::new(create_mcp_state(
        catalog,
        sessions.clone(),
        upstream,
        McpSettings {
            transport: config.transport,
            default_mode: config.default_mode.clone(),
            consent_policy: config.consent_policy,
            consent_timeout: config.consent_timeout,
        },
    ));

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down");
                signal_token.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    let result = match config.transport {
        TransportKind::Stdio => {
            run_stdio(
                mcp_state,
                config.consent_policy.disable_elicitation,
                shutdown.clone(),
            )
            .await
        }
        TransportKind::Http => {
            let state = ServerState::new(config.server_config(), mcp_state);
            run_server(state, shutdown.clone()).await
        }
    };

    shutdown.cancel();
    sessions.shutdown();
    result
}
