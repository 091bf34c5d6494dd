use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub frontend_url: Option<String>,
    pub frontend_dir_path: Option<String>,
    pub request_timeout_sec: Option<u64>,

    // Sections
    pub spotify: Option<SpotifyConfig>,
    pub analysis: Option<AnalysisConfig>,
    pub cors: Option<CorsConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub api_base_url: Option<String>,
    pub accounts_base_url: Option<String>,
    pub scopes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    pub batch_size: Option<usize>,
    pub max_retry_delay_secs: Option<u64>,
    pub max_playlist_pages: Option<usize>,
    pub recent_limit: Option<u32>,
    pub include_local: Option<bool>,
    pub require_track_type: Option<bool>,
    pub require_valid_id: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Option<Vec<String>>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
