//! Test server lifecycle management
//!
//! Each test gets its own fake upstream and its own server instance wired to
//! it, both on random local ports.

use super::constants::*;
use super::mock_spotify::MockSpotify;
use aurafy_server::config::{AppConfig, CliConfig};
use aurafy_server::server::{make_app, RequestsLoggingLevel, ServerState};
use std::time::Duration;
use tokio::net::TcpListener;

/// Test server instance backed by a [`MockSpotify`]
///
/// When dropped, both the server and the fake upstream shut down.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// The fake upstream, for scripting failures and inspecting calls
    pub mock: MockSpotify,

    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a server with client credentials configured.
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawns a server that has no client credentials.
    pub async fn spawn_without_credentials() -> Self {
        Self::spawn_with(|config| {
            config.spotify.client_id = None;
            config.spotify.client_secret = None;
        })
        .await
    }

    /// Spawns a server after letting the caller adjust the resolved config.
    ///
    /// # Panics
    ///
    /// Panics if binding, state construction or readiness fails.
    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let mock = MockSpotify::spawn().await;

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let cli = CliConfig {
            port,
            metrics_port: 0,
            logging_level: RequestsLoggingLevel::None,
            frontend_url: Some(FRONTEND_URL.to_string()),
            frontend_dir_path: None,
            client_id: Some(TEST_CLIENT_ID.to_string()),
            client_secret: Some(TEST_CLIENT_SECRET.to_string()),
            redirect_uri: Some(format!("{}/api/callback", base_url)),
            request_timeout_sec: REQUEST_TIMEOUT_SECS,
        };
        let mut app_config = AppConfig::resolve(&cli, None).expect("Failed to resolve config");
        app_config.spotify.api_base_url = format!("{}/v1", mock.base_url);
        app_config.spotify.accounts_base_url = format!("{}/accounts", mock.base_url);
        configure(&mut app_config);

        let state = ServerState::from_app_config(&app_config).expect("Failed to build state");
        let app = make_app(state);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            mock,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
