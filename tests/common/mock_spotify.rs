//! Fake upstream for end-to-end tests
//!
//! Serves the subset of the Web API and accounts service the server talks
//! to, backed by the fixtures in `constants`. Bound to a random local port.

use super::constants::*;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub struct MockState {
    base_url: String,
    feature_requests: AtomicUsize,
    rate_limited_feature_requests: AtomicUsize,
    failing_feature_request: AtomicUsize,
    rotate_refresh_token: AtomicBool,
    token_requests: Mutex<Vec<HashMap<String, String>>>,
}

/// Handle to a running fake upstream. Shuts down on drop.
pub struct MockSpotify {
    pub base_url: String,
    state: Arc<MockState>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockSpotify {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock upstream");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let state = Arc::new(MockState {
            base_url: base_url.clone(),
            feature_requests: AtomicUsize::new(0),
            rate_limited_feature_requests: AtomicUsize::new(0),
            failing_feature_request: AtomicUsize::new(usize::MAX),
            rotate_refresh_token: AtomicBool::new(false),
            token_requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1/me", get(me))
            .route("/v1/me/playlists", get(my_playlists))
            .route("/v1/me/player/recently-played", get(recently_played))
            .route("/v1/playlists/{id}", get(playlist))
            .route("/v1/playlists/{id}/tracks", get(playlist_tracks))
            .route("/v1/audio-features", get(audio_features))
            .route("/accounts/api/token", post(token))
            .with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Mock upstream failed");
        });

        Self {
            base_url,
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Number of calls the feature endpoint received, rejected ones included.
    pub fn feature_requests(&self) -> usize {
        self.state.feature_requests.load(Ordering::SeqCst)
    }

    /// Answer the next `n` feature calls with 429 and `Retry-After: 0`.
    pub fn rate_limit_feature_requests(&self, n: usize) {
        self.state
            .rate_limited_feature_requests
            .store(n, Ordering::SeqCst);
    }

    /// Answer the feature call with the given zero-based index with 500.
    pub fn fail_feature_request_at(&self, index: usize) {
        self.state
            .failing_feature_request
            .store(index, Ordering::SeqCst);
    }

    /// Issue a new refresh token on the next refresh grants.
    pub fn rotate_refresh_token(&self) {
        self.state.rotate_refresh_token.store(true, Ordering::SeqCst);
    }

    /// Form bodies posted to the token endpoint, oldest first.
    pub fn token_requests(&self) -> Vec<HashMap<String, String>> {
        self.state.token_requests.lock().unwrap().clone()
    }
}

impl Drop for MockSpotify {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn dance_features(id: &str) -> Value {
    json!({
        "id": id,
        "danceability": 0.82,
        "energy": 0.88,
        "valence": 0.55,
        "acousticness": 0.05,
        "instrumentalness": 0.0,
        "tempo": 124.0,
        "loudness": -5.2,
    })
}

fn mellow_features(id: &str) -> Value {
    json!({
        "id": id,
        "danceability": 0.35,
        "energy": 0.25,
        "valence": 0.2,
        "acousticness": 0.7,
        "instrumentalness": 0.1,
        "tempo": 80.0,
    })
}

fn features_for(id: &str) -> Value {
    match id {
        DANCE_TRACK_1_ID | DANCE_TRACK_2_ID | DANCE_TRACK_3_ID => dance_features(id),
        MELLOW_TRACK_1_ID | MELLOW_TRACK_2_ID => mellow_features(id),
        _ => Value::Null,
    }
}

fn track_item(id: &str, name: &str) -> Value {
    json!({
        "added_at": "2024-01-01T00:00:00Z",
        "track": {
            "id": id,
            "name": name,
            "artists": [{ "name": "Test Artist" }],
            "duration_ms": 210000,
            "popularity": 50,
            "is_local": false,
            "type": "track",
        }
    })
}

fn local_item() -> Value {
    json!({
        "track": {
            "id": null,
            "name": "Home Recording",
            "artists": [{ "name": "Me" }],
            "is_local": true,
            "type": "track",
        }
    })
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "status": status.as_u16(), "message": message } })),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", VALID_TOKEN))
        .unwrap_or(false)
}

macro_rules! require_token {
    ($headers:expr) => {
        if !authorized(&$headers) {
            return error_body(StatusCode::UNAUTHORIZED, "The access token expired");
        }
    };
}

/// Decrement a counter if positive, reporting whether it was.
fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

// ============================================================================
// Web API handlers
// ============================================================================

async fn me(headers: HeaderMap) -> Response {
    require_token!(headers);
    Json(json!({
        "id": TEST_USER_ID,
        "display_name": TEST_USER_NAME,
        "email": "tester@example.com",
        "country": "IT",
        "product": "premium",
    }))
    .into_response()
}

async fn my_playlists(headers: HeaderMap) -> Response {
    require_token!(headers);
    Json(json!({
        "items": [
            { "id": DANCE_PLAYLIST_ID, "name": "Dance Mix", "tracks": { "total": 5 } },
            { "id": EMPTY_PLAYLIST_ID, "name": "Nothing Yet", "tracks": { "total": 0 } },
        ],
        "total": 2,
        "next": null,
    }))
    .into_response()
}

async fn recently_played(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    require_token!(headers);
    let limit: u64 = params
        .get("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(20);
    Json(json!({
        "items": [
            track_item(MELLOW_TRACK_1_ID, "Rainy Window"),
            track_item(MELLOW_TRACK_2_ID, "Grey Morning"),
            track_item(FEATURELESS_TRACK_ID, "Unreleased Demo"),
        ],
        "limit": limit,
        "next": null,
    }))
    .into_response()
}

async fn playlist(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    require_token!(headers);
    match id.as_str() {
        DANCE_PLAYLIST_ID => Json(json!({
            "id": id,
            "name": "Dance Mix",
            "public": true,
            "owner": { "display_name": TEST_USER_NAME },
            "tracks": {
                "items": [
                    track_item(DANCE_TRACK_1_ID, "Floor Filler"),
                    track_item(DANCE_TRACK_2_ID, "Strobe"),
                    local_item(),
                ],
                "total": 5,
                "next": format!("{}/v1/playlists/{}/tracks?offset=3&limit=3", state.base_url, id),
            },
        }))
        .into_response(),
        EMPTY_PLAYLIST_ID => Json(json!({
            "id": id,
            "name": "Nothing Yet",
            "public": false,
            "owner": { "display_name": TEST_USER_NAME },
            "tracks": { "items": [], "total": 0, "next": null },
        }))
        .into_response(),
        _ => error_body(StatusCode::NOT_FOUND, "Resource not found"),
    }
}

async fn playlist_tracks(headers: HeaderMap, Path(id): Path<String>) -> Response {
    require_token!(headers);
    if id != DANCE_PLAYLIST_ID {
        return error_body(StatusCode::NOT_FOUND, "Resource not found");
    }
    Json(json!({
        "items": [
            track_item(DANCE_TRACK_3_ID, "Last Call"),
            track_item(DANCE_TRACK_1_ID, "Floor Filler"),
        ],
        "total": 5,
        "next": null,
    }))
    .into_response()
}

async fn audio_features(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    require_token!(headers);
    let index = state.feature_requests.fetch_add(1, Ordering::SeqCst);

    if take_one(&state.rate_limited_feature_requests) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "0")],
            Json(json!({ "error": { "status": 429, "message": "API rate limit exceeded" } })),
        )
            .into_response();
    }
    if index == state.failing_feature_request.load(Ordering::SeqCst) {
        return error_body(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
    }

    let records: Vec<Value> = params
        .get("ids")
        .map(|ids| ids.split(',').filter(|s| !s.is_empty()).map(features_for).collect())
        .unwrap_or_default();
    Json(json!({ "audio_features": records })).into_response()
}

// ============================================================================
// Accounts service
// ============================================================================

async fn token(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.token_requests.lock().unwrap().push(form.clone());

    let has_client_auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Basic "))
        .unwrap_or(false);
    if !has_client_auth {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid_client" })),
        )
            .into_response();
    }

    let invalid_grant = || {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid grant" })),
        )
            .into_response()
    };

    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") => {
            let code_ok = form.get("code").map(String::as_str) == Some(AUTH_CODE);
            let verifier_ok = form
                .get("code_verifier")
                .map(|v| !v.is_empty())
                .unwrap_or(false);
            if !code_ok || !verifier_ok {
                return invalid_grant();
            }
            Json(json!({
                "access_token": VALID_TOKEN,
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": REFRESH_TOKEN,
                "scope": "user-read-private playlist-read-private",
            }))
            .into_response()
        }
        Some("refresh_token") => {
            if form.get("refresh_token").map(String::as_str) != Some(REFRESH_TOKEN) {
                return invalid_grant();
            }
            let mut body = json!({
                "access_token": REFRESHED_TOKEN,
                "token_type": "Bearer",
                "expires_in": 3600,
            });
            if state.rotate_refresh_token.load(Ordering::SeqCst) {
                body["refresh_token"] = Value::String(ROTATED_REFRESH_TOKEN.to_string());
            }
            Json(body).into_response()
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "unsupported_grant_type" })),
        )
            .into_response(),
    }
}
