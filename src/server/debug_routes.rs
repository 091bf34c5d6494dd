//! Diagnostics for token and track problems.
//!
//! These endpoints report what the analysis would see for a playlist or the
//! listening history: which items carry usable ids and whether the feature
//! lookup returns anything for a small sample.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use super::access_token::AccessToken;
use super::api_error::ApiError;
use super::state::{GuardedSpotifyApi, ServerState};
use crate::oauth::token_preview;
use crate::spotify::SpotifyApi;
use crate::tracks::{partition_by_validity, track_references, TrackReference};

const SAMPLE_TRACKS: usize = 10;
const SAMPLE_IDS: usize = 5;
const FEATURE_TEST_TRACKS: usize = 5;
const RECENT_TEST_LIMIT: u32 = 20;

#[derive(Serialize, Debug)]
struct TrackSample {
    id: Option<String>,
    name: Option<String>,
    artists: String,
    is_local: bool,
    is_playable: Option<bool>,
    duration_ms: Option<u64>,
    popularity: Option<u32>,
    #[serde(rename = "type")]
    item_type: Option<String>,
}

impl From<&TrackReference> for TrackSample {
    fn from(track: &TrackReference) -> Self {
        TrackSample {
            id: track.id.clone(),
            name: track.name.clone(),
            artists: track.artist_names(),
            is_local: track.is_local,
            is_playable: track.is_playable,
            duration_ms: track.duration_ms,
            popularity: track.popularity,
            item_type: track.item_type.clone(),
        }
    }
}

fn track_name<'a>(tracks: &'a [TrackReference], id: &str) -> &'a str {
    tracks
        .iter()
        .find(|t| t.id.as_deref() == Some(id))
        .and_then(|t| t.name.as_deref())
        .unwrap_or("Unknown")
}

/// Id validity breakdown and a small feature lookup for raw items.
async fn inspect_items(spotify: &SpotifyApi, token: &str, items: &[Value]) -> Value {
    let tracks = track_references(items);
    let ids: Vec<String> = tracks.iter().filter_map(|t| t.id.clone()).collect();
    let (valid, invalid) = partition_by_validity(&ids);
    debug!(
        "Found {} track ids, {} valid, {} invalid",
        ids.len(),
        valid.len(),
        invalid.len()
    );

    let test_batch: Vec<String> = valid.iter().take(FEATURE_TEST_TRACKS).cloned().collect();
    let audio_features_test = if test_batch.is_empty() {
        json!({ "tested_tracks": 0, "results": [] })
    } else {
        match spotify.audio_features(token, &test_batch).await {
            Ok(records) => {
                let results: Vec<Value> = test_batch
                    .iter()
                    .enumerate()
                    .map(|(i, id)| {
                        let name = track_name(&tracks, id);
                        match records.get(i).cloned().flatten() {
                            Some(feature) => json!({
                                "track_id": id,
                                "track_name": name,
                                "has_features": true,
                                "features": {
                                    "danceability": feature.get("danceability"),
                                    "energy": feature.get("energy"),
                                    "valence": feature.get("valence"),
                                },
                            }),
                            None => json!({
                                "track_id": id,
                                "track_name": name,
                                "has_features": false,
                                "error": "No features returned",
                            }),
                        }
                    })
                    .collect();
                json!({ "tested_tracks": test_batch.len(), "results": results })
            }
            Err(err) => json!({
                "tested_tracks": test_batch.len(),
                "results": [],
                "error": err.to_string(),
            }),
        }
    };

    let sample: Vec<TrackSample> = tracks.iter().take(SAMPLE_TRACKS).map(TrackSample::from).collect();

    json!({
        "tracks_sample": sample,
        "track_ids_analysis": {
            "total": ids.len(),
            "valid_format": valid.len(),
            "invalid_format": invalid.len(),
            "invalid_examples": invalid.iter().take(SAMPLE_IDS).collect::<Vec<_>>(),
            "valid_examples": valid.iter().take(SAMPLE_IDS).collect::<Vec<_>>(),
        },
        "audio_features_test": audio_features_test,
    })
}

fn debug_info(user: &Value) -> Value {
    json!({
        "user": user.get("display_name"),
        "user_id": user.get("id"),
        "token_valid": true,
    })
}

async fn test_token(
    AccessToken(token): AccessToken,
    State(spotify): State<GuardedSpotifyApi>,
) -> Json<Value> {
    let (valid, data) = match spotify.current_user(&token).await {
        Ok(user) => (true, user),
        Err(err) => (false, err.detail()),
    };
    Json(json!({
        "valid": valid,
        "data": data,
        "token_preview": token_preview(&token),
    }))
}

async fn test_playlist(
    AccessToken(token): AccessToken,
    State(spotify): State<GuardedSpotifyApi>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = spotify.current_user(&token).await?;
    let playlist = spotify.playlist(&token, &id).await?;
    let items = spotify.playlist_items(&token, &playlist, 1).await;

    let mut report = inspect_items(&spotify, &token, &items.items).await;
    report["playlist_info"] = json!({
        "name": playlist.get("name"),
        "id": id,
        "total_tracks": playlist.pointer("/tracks/total"),
        "owner": playlist.pointer("/owner/display_name"),
        "public": playlist.get("public"),
    });
    report["debug_info"] = debug_info(&user);
    Ok(Json(report))
}

async fn test_recent(
    AccessToken(token): AccessToken,
    State(spotify): State<GuardedSpotifyApi>,
) -> Result<Json<Value>, ApiError> {
    let user = spotify.current_user(&token).await?;
    let recent = spotify.recently_played(&token, RECENT_TEST_LIMIT).await?;
    let items = recent
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut report = inspect_items(&spotify, &token, &items).await;
    report["debug_info"] = debug_info(&user);
    Ok(Json(report))
}

pub(super) fn make_debug_routes(state: ServerState) -> Router {
    Router::new()
        .route("/test-token", get(test_token))
        .route("/test-playlist/{id}", get(test_playlist))
        .route("/test-recent", get(test_recent))
        .with_state(state)
}
