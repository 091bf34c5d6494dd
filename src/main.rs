use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use aurafy_server::config::{self, AppConfig, FileConfig};
use aurafy_server::server::{metrics, run_server, RequestsLoggingLevel, ServerState};

/// How often expired pending authorizations are swept.
const AUTH_STATE_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 8000)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Frontend the OAuth callback redirects to. Also the default CORS origin.
    #[clap(long)]
    pub frontend_url: Option<String>,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Spotify application client id.
    #[clap(long, env = "SPOTIFY_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Spotify application client secret.
    #[clap(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Redirect URI registered with the Spotify application.
    #[clap(long, env = "SPOTIFY_REDIRECT_URI")]
    pub redirect_uri: Option<String>,

    /// Timeout in seconds for requests to Spotify.
    #[clap(long, default_value_t = 10)]
    pub request_timeout_sec: u64,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            frontend_url: args.frontend_url.clone(),
            frontend_dir_path: args.frontend_dir_path.clone(),
            client_id: args.client_id.clone(),
            client_secret: args.client_secret.clone(),
            redirect_uri: args.redirect_uri.clone(),
            request_timeout_sec: args.request_timeout_sec,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&config::CliConfig::from(&cli_args), file_config)?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    info!("Spotify API at {}", app_config.spotify.api_base_url);
    info!(
        "Analysis: batch size {}, up to {} playlist pages, recent limit {}",
        app_config.analysis.batch_size,
        app_config.analysis.max_playlist_pages,
        app_config.analysis.recent_limit
    );
    let state = ServerState::from_app_config(&app_config)?;

    // Sweep authorizations that never got their callback
    let auth_state_store = state.auth_state_store.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(AUTH_STATE_CLEANUP_INTERVAL);

        // Skip the first immediate tick, wait for the first interval
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = auth_state_store.cleanup_expired().await;
            if removed > 0 {
                info!("Dropped {} expired authorization states", removed);
            }
            metrics::set_pending_auth_states(auth_state_store.len().await);
        }
    });

    tokio::select! {
        result = run_server(state) => {
            info!("HTTP server stopped: {:?}", result);
            result
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}
