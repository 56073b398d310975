mod file_config;

pub use file_config::{ConsentConfig, FileConfig, SessionConfig, UpstreamConfig};

use crate::consent::ConsentPolicy;
use crate::server::{RequestsLoggingLevel, ServerConfig};
use crate::session::{SessionSettings, TransportKind, DEFAULT_TOOLS_MODE};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the upstream API token.
pub const API_TOKEN_ENV: &str = "MIST_APITOKEN";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub transport: TransportKind,
    pub host: String,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub default_mode: String,
    pub session_timeout_minutes: u64,
    pub cleanup_interval_secs: u64,
    pub consent_timeout_secs: u64,
    pub enable_write_tools: bool,
    pub disable_elicitation: bool,
    pub upstream_url: Option<String>,
    pub upstream_token: Option<String>,
    pub upstream_timeout_sec: u64,
    pub catalog_file: Option<PathBuf>,
    pub admin_token: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Stdio,
            host: "127.0.0.1".to_string(),
            port: 8000,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Path,
            default_mode: DEFAULT_TOOLS_MODE.to_string(),
            session_timeout_minutes: 60,
            cleanup_interval_secs: 300,
            consent_timeout_secs: 300,
            enable_write_tools: false,
            disable_elicitation: false,
            upstream_url: None,
            upstream_token: None,
            upstream_timeout_sec: 60,
            catalog_file: None,
            admin_token: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub transport: TransportKind,
    pub host: String,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub default_mode: String,
    pub admin_token: Option<String>,

    pub session: SessionSettings,
    pub consent_policy: ConsentPolicy,
    pub consent_timeout: Duration,
    pub upstream: UpstreamSettings,

    /// Alternative catalog; the built-in one is used when absent.
    pub catalog_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub url: Option<String>,
    pub token: Option<String>,
    pub timeout_sec: u64,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let transport = match file.transport {
            Some(raw) => match TransportKind::from_str(&raw, true) {
                Ok(transport) => transport,
                Err(_) => bail!("Unknown transport {:?}, expected stdio or http", raw),
            },
            None => cli.transport,
        };

        let host = file.host.unwrap_or_else(|| cli.host.clone());
        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let default_mode = file
            .default_mode
            .unwrap_or_else(|| cli.default_mode.clone())
            .trim()
            .to_string();
        if default_mode.is_empty() {
            bail!("default_mode must not be empty");
        }

        let admin_token = file
            .admin_token
            .or_else(|| cli.admin_token.clone())
            .filter(|t| !t.trim().is_empty());

        // Session settings
        let session_file = file.session.unwrap_or_default();
        let session_timeout_minutes = session_file
            .timeout_minutes
            .unwrap_or(cli.session_timeout_minutes);
        let cleanup_interval_secs = session_file
            .cleanup_interval_secs
            .unwrap_or(cli.cleanup_interval_secs);
        if session_timeout_minutes == 0 {
            bail!("Session timeout must be greater than zero");
        }
        if cleanup_interval_secs == 0 {
            bail!("Cleanup interval must be greater than zero");
        }

        // Consent settings
        let consent_file = file.consent.unwrap_or_default();
        let consent_policy = ConsentPolicy {
            enable_write_tools: consent_file
                .enable_write_tools
                .unwrap_or(cli.enable_write_tools),
            disable_elicitation: consent_file
                .disable_elicitation
                .unwrap_or(cli.disable_elicitation),
        };
        let consent_timeout_secs = consent_file
            .timeout_secs
            .unwrap_or(cli.consent_timeout_secs);
        if consent_timeout_secs == 0 {
            bail!("Consent timeout must be greater than zero");
        }

        // Upstream settings
        let upstream_file = file.upstream.unwrap_or_default();
        let upstream = UpstreamSettings {
            url: upstream_file
                .url
                .or_else(|| cli.upstream_url.clone())
                .filter(|u| !u.trim().is_empty()),
            token: upstream_file
                .token
                .or_else(|| cli.upstream_token.clone())
                .filter(|t| !t.trim().is_empty()),
            timeout_sec: upstream_file.timeout_sec.unwrap_or(cli.upstream_timeout_sec),
        };

        let catalog_file = file
            .catalog_file
            .map(PathBuf::from)
            .or_else(|| cli.catalog_file.clone());
        if let Some(path) = &catalog_file {
            if !path.is_file() {
                bail!("Catalog file does not exist: {:?}", path);
            }
        }

        Ok(Self {
            transport,
            host,
            port,
            metrics_port,
            logging_level,
            default_mode,
            admin_token,
            session: SessionSettings {
                idle_timeout: Duration::from_secs(session_timeout_minutes * 60),
                cleanup_interval: Duration::from_secs(cleanup_interval_secs),
            },
            consent_policy,
            consent_timeout: Duration::from_secs(consent_timeout_secs),
            upstream,
            catalog_file,
        })
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            host: self.host.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            admin_token: self.admin_token.clone(),
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_parse_logging_level() {
        assert!(matches!(
            parse_logging_level("none"),
            Some(RequestsLoggingLevel::None)
        ));
        assert!(matches!(
            parse_logging_level("headers"),
            Some(RequestsLoggingLevel::Headers)
        ));
        // Case insensitive
        assert!(matches!(
            parse_logging_level("PATH"),
            Some(RequestsLoggingLevel::Path)
        ));
        // Invalid
        assert!(parse_logging_level("invalid").is_none());
    }

    #[test]
    fn test_resolve_defaults() {
        let config = AppConfig::resolve(&CliConfig::default(), None).unwrap();

        assert_eq!(config.transport, TransportKind::Stdio);
        assert_eq!(config.default_mode, "managed");
        assert_eq!(config.session.idle_timeout, Duration::from_secs(3600));
        assert_eq!(config.session.cleanup_interval, Duration::from_secs(300));
        assert_eq!(config.consent_timeout, Duration::from_secs(300));
        assert!(!config.consent_policy.enable_write_tools);
        assert!(!config.consent_policy.disable_elicitation);
        assert!(config.upstream.url.is_none());
        assert!(config.catalog_file.is_none());
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_resolve_cli_only() {
        let cli = CliConfig {
            transport: TransportKind::Http,
            host: "0.0.0.0".to_string(),
            port: 9000,
            metrics_port: 0,
            logging_level: RequestsLoggingLevel::Headers,
            default_mode: "all".to_string(),
            session_timeout_minutes: 5,
            enable_write_tools: true,
            upstream_url: Some("https://api.mist.com/mcp".to_string()),
            upstream_token: Some("tok".to_string()),
            admin_token: Some("admin".to_string()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.transport, TransportKind::Http);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.metrics_port, 0);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Headers);
        assert_eq!(config.default_mode, "all");
        assert_eq!(config.session.idle_timeout, Duration::from_secs(300));
        assert!(config.consent_policy.enable_write_tools);
        assert_eq!(config.upstream.token.as_deref(), Some("tok"));

        let server_config = config.server_config();
        assert_eq!(server_config.port, 9000);
        assert_eq!(server_config.admin_token.as_deref(), Some("admin"));
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let cli = CliConfig {
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Path,
            consent_timeout_secs: 120,
            disable_elicitation: false,
            ..Default::default()
        };

        let file_config = FileConfig {
            transport: Some("HTTP".to_string()),
            port: Some(4000),
            logging_level: Some("body".to_string()),
            consent: Some(ConsentConfig {
                disable_elicitation: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        // TOML values should override CLI
        assert_eq!(config.transport, TransportKind::Http);
        assert_eq!(config.port, 4000);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Body);
        assert!(config.consent_policy.disable_elicitation);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.consent_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_resolve_unknown_transport_error() {
        let file_config = FileConfig {
            transport: Some("carrier-pigeon".to_string()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&CliConfig::default(), Some(file_config));
        assert!(result.unwrap_err().to_string().contains("Unknown transport"));
    }

    #[test]
    fn test_resolve_zero_intervals_error() {
        let cli = CliConfig {
            session_timeout_minutes: 0,
            ..Default::default()
        };
        let err = AppConfig::resolve(&cli, None).unwrap_err();
        assert!(err.to_string().contains("Session timeout"));

        let cli = CliConfig {
            cleanup_interval_secs: 0,
            ..Default::default()
        };
        let err = AppConfig::resolve(&cli, None).unwrap_err();
        assert!(err.to_string().contains("Cleanup interval"));

        let file_config = FileConfig {
            consent: Some(ConsentConfig {
                timeout_secs: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = AppConfig::resolve(&CliConfig::default(), Some(file_config)).unwrap_err();
        assert!(err.to_string().contains("Consent timeout"));
    }

    #[test]
    fn test_resolve_missing_catalog_file_error() {
        let cli = CliConfig {
            catalog_file: Some(PathBuf::from("/nonexistent/catalog.json")),
            ..Default::default()
        };
        let err = AppConfig::resolve(&cli, None).unwrap_err();
        assert!(err.to_string().contains("Catalog file does not exist"));
    }

    #[test]
    fn test_resolve_catalog_file_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.json");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{{}}").unwrap();

        let file_config = FileConfig {
            catalog_file: Some(path.to_string_lossy().to_string()),
            ..Default::default()
        };
        let config = AppConfig::resolve(&CliConfig::default(), Some(file_config)).unwrap();
        assert_eq!(config.catalog_file, Some(path));
    }

    #[test]
    fn test_resolve_blank_tokens_ignored() {
        let cli = CliConfig {
            upstream_token: Some("  ".to_string()),
            admin_token: Some(String::new()),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, None).unwrap();
        assert!(config.upstream.token.is_none());
        assert!(config.admin_token.is_none());
    }
}
