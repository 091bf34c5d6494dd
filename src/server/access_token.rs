use super::api_error::ApiError;
use super::state::ServerState;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};
use tracing::debug;

pub const QUERY_ACCESS_TOKEN_KEY: &str = "access_token";

/// The caller's upstream access token, forwarded as-is.
#[derive(Debug, Clone)]
pub struct AccessToken(pub String);

fn extract_token_from_query(parts: &Parts) -> Option<String> {
    parts.uri.query()?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key != QUERY_ACCESS_TOKEN_KEY || value.is_empty() {
            return None;
        }
        urlencoding::decode(value).ok().map(|v| v.into_owned())
    })
}

fn extract_token_from_headers(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<ServerState> for AccessToken {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        match extract_token_from_query(parts).or_else(|| extract_token_from_headers(parts)) {
            Some(token) => Ok(AccessToken(token)),
            None => {
                debug!("No access token in query nor headers.");
                Err(ApiError::new(
                    StatusCode::UNAUTHORIZED,
                    "Missing access token",
                ))
            }
        }
    }
}
