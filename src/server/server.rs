use anyhow::{Context, Result};
use std::time::Duration;

use axum::{
    extract::State,
    http::HeaderValue,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use super::analysis_routes::make_analysis_routes;
use super::auth_routes::make_auth_routes;
use super::debug_routes::make_debug_routes;
use super::spotify_routes::make_spotify_routes;
use super::{log_requests, metrics, state::ServerState, ServerConfig};

pub const WELCOME_MESSAGE: &str = "Welcome to aurafy Your Playlist API";

#[derive(Serialize)]
struct ServerStats {
    pub message: &'static str,
    pub uptime: String,
    pub version: &'static str,
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
    let stats = ServerStats {
        message: WELCOME_MESSAGE,
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION"),
    };
    Json(stats)
}

fn make_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    // Credentials can't be combined with wildcard methods or headers.
    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

pub fn make_app(state: ServerState) -> Router {
    let config = state.config.clone();

    let api_routes: Router = Router::new()
        .merge(make_auth_routes(state.clone()))
        .merge(make_spotify_routes(state.clone()))
        .merge(make_analysis_routes(state.clone()))
        .nest("/debug", make_debug_routes(state.clone()));

    let home_router: Router = match config.frontend_dir_path.as_ref() {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    home_router
        .nest("/api", api_routes)
        .layer(make_cors_layer(&config))
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics::metrics_handler))
}

pub async fn run_server(state: ServerState) -> Result<()> {
    let port = state.config.port;
    let metrics_port = state.config.metrics_port;
    let app = make_app(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Ready to serve at port {}!", port);
    info!("Metrics available at port {}!", metrics_port);

    tokio::try_join!(
        async { axum::serve(listener, app).await.context("HTTP server failed") },
        async {
            axum::serve(metrics_listener, make_metrics_app())
                .await
                .context("Metrics server failed")
        },
    )?;
    Ok(())
}
