use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::warn;

use crate::oauth::OAuthError;
use crate::spotify::SpotifyError;

/// Error answer of the API, rendered as `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: Value,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<Value>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<Value>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn credentials_not_configured() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Spotify credentials not configured",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<SpotifyError> for ApiError {
    fn from(err: SpotifyError) -> Self {
        let status = err.status_code();
        warn!("Upstream call failed with {}: {}", status, err);
        Self::new(status, err.detail())
    }
}

impl From<OAuthError> for ApiError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::NotConfigured => Self::credentials_not_configured(),
            OAuthError::StateMismatch | OAuthError::StateExpired => {
                Self::bad_request(err.to_string())
            }
            OAuthError::TokenRequest { .. } | OAuthError::Transport(_) => {
                Self::bad_request(format!("Failed to retrieve access token: {}", err))
            }
        }
    }
}
