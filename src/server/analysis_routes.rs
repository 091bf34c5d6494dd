use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::access_token::AccessToken;
use super::api_error::ApiError;
use super::state::{GuardedAnalysisService, ServerState};
use crate::analysis::{analyze_records, AnalysisResponse, AuraAnalysis};

#[derive(Deserialize, Debug)]
struct AudioFeaturesBody {
    track_ids: Vec<String>,
    access_token: String,
}

#[derive(Deserialize, Debug)]
struct CalculateAuraBody {
    features_list: Vec<Option<Value>>,
}

async fn analyze_playlist(
    AccessToken(token): AccessToken,
    State(analysis): State<GuardedAnalysisService>,
    Path(id): Path<String>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let response = analysis.analyze_playlist(&token, &id).await?;
    info!(
        "Playlist {} classified as {}",
        id, response.analysis.aura.name
    );
    Ok(Json(response))
}

async fn analyze_recent(
    AccessToken(token): AccessToken,
    State(analysis): State<GuardedAnalysisService>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let response = analysis.analyze_recent(&token).await?;
    info!(
        "Recent tracks classified as {}",
        response.analysis.aura.name
    );
    Ok(Json(response))
}

/// Raw feature records for the given ids, batched like an analysis would.
async fn audio_features(
    State(analysis): State<GuardedAnalysisService>,
    Json(body): Json<AudioFeaturesBody>,
) -> Json<Vec<Option<Value>>> {
    let result = analysis
        .fetch_features(&body.access_token, &body.track_ids)
        .await;
    Json(result.records)
}

async fn calculate_aura(
    State(analysis): State<GuardedAnalysisService>,
    Json(body): Json<CalculateAuraBody>,
) -> Json<AuraAnalysis> {
    let count = body.features_list.len();
    Json(analyze_records(
        analysis.classifier(),
        &body.features_list,
        count,
        true,
    ))
}

pub(super) fn make_analysis_routes(state: ServerState) -> Router {
    Router::new()
        .route("/analyze/playlist/{id}", get(analyze_playlist))
        .route("/analyze/recent", get(analyze_recent))
        .route("/audio_features", post(audio_features))
        .route("/calculate_aura", post(calculate_aura))
        .with_state(state)
}
