use anyhow::Result;
use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use crate::analysis::AnalysisService;
use crate::config::AppConfig;
use crate::mood::Classifier;
use crate::oauth::{AuthStateStore, SpotifyAuthClient};
use crate::spotify::SpotifyApi;

use super::ServerConfig;

pub type GuardedSpotifyApi = Arc<SpotifyApi>;
pub type GuardedAnalysisService = Arc<AnalysisService>;
pub type OptionalAuthClient = Option<Arc<SpotifyAuthClient>>;
pub type GuardedAuthStateStore = Arc<AuthStateStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub spotify: GuardedSpotifyApi,
    pub analysis: GuardedAnalysisService,
    pub auth_client: OptionalAuthClient,
    pub auth_state_store: GuardedAuthStateStore,
}

impl ServerState {
    /// Build every shared component from the resolved configuration.
    pub fn from_app_config(app_config: &AppConfig) -> Result<Self> {
        let timeout = app_config.request_timeout();
        let spotify = Arc::new(SpotifyApi::new(
            &app_config.spotify.api_base_url,
            timeout,
        )?);
        let auth_client =
            SpotifyAuthClient::from_settings(&app_config.spotify, timeout)?.map(Arc::new);
        let analysis = Arc::new(AnalysisService::new(
            spotify.clone(),
            Classifier::default(),
            app_config.analysis.clone(),
        ));

        Ok(ServerState {
            config: ServerConfig::from(app_config),
            start_time: Instant::now(),
            spotify,
            analysis,
            auth_client,
            auth_state_store: Arc::new(AuthStateStore::new()),
        })
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedSpotifyApi {
    fn from_ref(input: &ServerState) -> Self {
        input.spotify.clone()
    }
}

impl FromRef<ServerState> for GuardedAnalysisService {
    fn from_ref(input: &ServerState) -> Self {
        input.analysis.clone()
    }
}

impl FromRef<ServerState> for OptionalAuthClient {
    fn from_ref(input: &ServerState) -> Self {
        input.auth_client.clone()
    }
}

impl FromRef<ServerState> for GuardedAuthStateStore {
    fn from_ref(input: &ServerState) -> Self {
        input.auth_state_store.clone()
    }
}
