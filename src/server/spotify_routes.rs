use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use super::access_token::AccessToken;
use super::api_error::ApiError;
use super::state::{GuardedAnalysisService, GuardedSpotifyApi, ServerState};

/// Upper bound the upstream accepts for the history `limit` parameter.
const MAX_RECENT_LIMIT: u32 = 50;

#[derive(Deserialize, Debug)]
struct RecentlyPlayedParams {
    limit: Option<u32>,
}

async fn get_me(
    AccessToken(token): AccessToken,
    State(spotify): State<GuardedSpotifyApi>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(spotify.current_user(&token).await?))
}

async fn get_playlists(
    AccessToken(token): AccessToken,
    State(spotify): State<GuardedSpotifyApi>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(spotify.user_playlists(&token).await?))
}

async fn get_recently_played(
    AccessToken(token): AccessToken,
    State(spotify): State<GuardedSpotifyApi>,
    State(analysis): State<GuardedAnalysisService>,
    Query(params): Query<RecentlyPlayedParams>,
) -> Result<Json<Value>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(analysis.settings().recent_limit)
        .clamp(1, MAX_RECENT_LIMIT);
    Ok(Json(spotify.recently_played(&token, limit).await?))
}

async fn get_playlist(
    AccessToken(token): AccessToken,
    State(spotify): State<GuardedSpotifyApi>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(spotify.playlist(&token, &id).await?))
}

pub(super) fn make_spotify_routes(state: ServerState) -> Router {
    Router::new()
        .route("/me", get(get_me))
        .route("/playlists", get(get_playlists))
        .route("/recently-played", get(get_recently_played))
        .route("/playlist/{id}", get(get_playlist))
        .with_state(state)
}
