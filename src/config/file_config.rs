use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// TOML configuration file. Every field is optional and overrides the
/// matching CLI value when present.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub transport: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub default_mode: Option<String>,
    pub admin_token: Option<String>,

    pub session: Option<SessionConfig>,
    pub consent: Option<ConsentConfig>,
    pub upstream: Option<UpstreamConfig>,
    pub catalog_file: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub timeout_minutes: Option<u64>,
    pub cleanup_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ConsentConfig {
    pub enable_write_tools: Option<bool>,
    pub disable_elicitation: Option<bool>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct UpstreamConfig {
    pub url: Option<String>,
    pub token: Option<String>,
    pub timeout_sec: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
