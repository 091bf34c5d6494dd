use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::feature_fetch::FeatureFetchError;

/// Errors returned by the upstream music API client.
#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("Upstream rejected the access token: {body}")]
    Unauthorized { body: Value },

    #[error("Upstream rate limit hit (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: Value },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),
}

impl SpotifyError {
    /// Status code a handler should answer with when passing this error on.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SpotifyError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            SpotifyError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            SpotifyError::Status { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            SpotifyError::Transport(err) if err.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            SpotifyError::Transport(_) | SpotifyError::InvalidResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Body to hand back to the caller as `detail`.
    pub fn detail(&self) -> Value {
        match self {
            SpotifyError::Unauthorized { body } | SpotifyError::Status { body, .. } => {
                body.clone()
            }
            other => Value::String(other.to_string()),
        }
    }
}

impl From<SpotifyError> for FeatureFetchError {
    fn from(err: SpotifyError) -> Self {
        match err {
            SpotifyError::RateLimited { retry_after } => {
                FeatureFetchError::RateLimited { retry_after }
            }
            other => FeatureFetchError::Failed(other.to_string()),
        }
    }
}

/// Parse a `Retry-After` header given in whole seconds.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Upstream error bodies are usually JSON; fall back to the raw text.
pub(super) fn body_to_value(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
