use super::RequestsLoggingLevel;
use crate::config::AppConfig;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub metrics_port: u16,
    /// Where the callback sends the browser, without trailing slash.
    pub frontend_url: String,
    pub frontend_dir_path: Option<String>,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 8000,
            metrics_port: 9091,
            frontend_url: crate::config::DEFAULT_FRONTEND_URL.to_string(),
            frontend_dir_path: None,
            allowed_origins: vec![crate::config::DEFAULT_FRONTEND_URL.to_string()],
        }
    }
}

impl From<&AppConfig> for ServerConfig {
    fn from(config: &AppConfig) -> Self {
        ServerConfig {
            requests_logging_level: config.logging_level.clone(),
            port: config.port,
            metrics_port: config.metrics_port,
            frontend_url: config.frontend_url.clone(),
            frontend_dir_path: config.frontend_dir_path.clone(),
            allowed_origins: config.cors.allowed_origins.clone(),
        }
    }
}
