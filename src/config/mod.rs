mod file_config;

pub use file_config::{AnalysisConfig, CorsConfig, FileConfig, SpotifyConfig};

use crate::feature_fetch::MAX_BATCH_SIZE;
use crate::oauth::DEFAULT_SCOPES;
use crate::server::RequestsLoggingLevel;
use crate::spotify::DEFAULT_API_BASE_URL;
use crate::tracks::TrackFilterPolicy;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8000/api/callback";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_url: Option<String>,
    pub frontend_dir_path: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub request_timeout_sec: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_url: String,
    pub frontend_dir_path: Option<String>,
    pub request_timeout_sec: u64,

    pub spotify: SpotifySettings,
    pub analysis: AnalysisSettings,
    pub cors: CorsSettings,
}

#[derive(Debug, Clone)]
pub struct SpotifySettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub api_base_url: String,
    pub accounts_base_url: String,
    pub scopes: Vec<String>,
}

impl Default for SpotifySettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            accounts_base_url: DEFAULT_ACCOUNTS_BASE_URL.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SpotifySettings {
    pub fn has_credentials(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// Identifiers per feature lookup, at most 100.
    pub batch_size: usize,
    pub max_retry_delay_secs: u64,
    pub max_playlist_pages: usize,
    pub recent_limit: u32,
    pub track_filter: TrackFilterPolicy,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            max_retry_delay_secs: 30,
            max_playlist_pages: 50,
            recent_limit: 50,
            track_filter: TrackFilterPolicy::default(),
        }
    }
}

impl AnalysisSettings {
    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_secs(self.max_retry_delay_secs)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if port == metrics_port && port != 0 {
            bail!("port and metrics_port must differ (both are {})", port);
        }

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_url = file
            .frontend_url
            .or_else(|| cli.frontend_url.clone())
            .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());
        let request_timeout_sec = file.request_timeout_sec.unwrap_or(cli.request_timeout_sec);

        // Spotify settings - [spotify] section over CLI/env over defaults
        let sp_file = file.spotify.unwrap_or_default();
        let sp_default = SpotifySettings::default();
        let spotify = SpotifySettings {
            client_id: sp_file.client_id.or_else(|| cli.client_id.clone()),
            client_secret: sp_file.client_secret.or_else(|| cli.client_secret.clone()),
            redirect_uri: sp_file
                .redirect_uri
                .or_else(|| cli.redirect_uri.clone())
                .unwrap_or(sp_default.redirect_uri),
            api_base_url: sp_file.api_base_url.unwrap_or(sp_default.api_base_url),
            accounts_base_url: sp_file
                .accounts_base_url
                .unwrap_or(sp_default.accounts_base_url),
            scopes: sp_file.scopes.unwrap_or(sp_default.scopes),
        };
        if !spotify.has_credentials() {
            warn!("Spotify client credentials not configured, auth endpoints will fail");
        }

        let an_file = file.analysis.unwrap_or_default();
        let an_default = AnalysisSettings::default();
        let filter_default = an_default.track_filter.clone();
        let requested_batch_size = an_file.batch_size.unwrap_or(an_default.batch_size);
        if requested_batch_size == 0 {
            bail!("analysis.batch_size must be at least 1");
        }
        if requested_batch_size > MAX_BATCH_SIZE {
            warn!(
                "analysis.batch_size {} exceeds the upstream limit, using {}",
                requested_batch_size, MAX_BATCH_SIZE
            );
        }
        let analysis = AnalysisSettings {
            batch_size: requested_batch_size.min(MAX_BATCH_SIZE),
            max_retry_delay_secs: an_file
                .max_retry_delay_secs
                .unwrap_or(an_default.max_retry_delay_secs),
            max_playlist_pages: an_file
                .max_playlist_pages
                .unwrap_or(an_default.max_playlist_pages)
                .max(1),
            recent_limit: an_file
                .recent_limit
                .unwrap_or(an_default.recent_limit)
                .clamp(1, 50),
            track_filter: TrackFilterPolicy {
                include_local: an_file.include_local.unwrap_or(filter_default.include_local),
                require_track_type: an_file
                    .require_track_type
                    .unwrap_or(filter_default.require_track_type),
                require_valid_id: an_file
                    .require_valid_id
                    .unwrap_or(filter_default.require_valid_id),
            },
        };

        let cors = CorsSettings {
            allowed_origins: file
                .cors
                .and_then(|c| c.allowed_origins)
                .unwrap_or_else(|| vec![frontend_url.clone()]),
        };

        Ok(Self {
            port,
            metrics_port,
            logging_level,
            frontend_url,
            frontend_dir_path,
            request_timeout_sec,
            spotify,
            analysis,
            cors,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
