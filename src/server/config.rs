use super::RequestsLoggingLevel;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub host: String,
    pub port: u16,
    /// Port of the Prometheus listener; 0 disables it.
    pub metrics_port: u16,
    /// Admin routes are mounted only when this is set.
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            host: "127.0.0.1".to_string(),
            port: 8000,
            metrics_port: 9091,
            admin_token: None,
        }
    }
}
