//! OAuth endpoints: start the authorization flow, receive the callback and
//! refresh access tokens.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::api_error::ApiError;
use super::metrics;
use super::state::{GuardedAuthStateStore, OptionalAuthClient, ServerState};
use super::ServerConfig;
use crate::oauth::token_preview;

#[derive(Deserialize, Debug)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RefreshParams {
    refresh_token: Option<String>,
}

async fn login(
    State(auth_client): State<OptionalAuthClient>,
    State(auth_state_store): State<GuardedAuthStateStore>,
) -> Result<Redirect, ApiError> {
    let auth_client = auth_client.ok_or_else(ApiError::credentials_not_configured)?;

    let (url, auth_state) = auth_client.authorize_url();
    auth_state_store.store(auth_state).await;
    metrics::set_pending_auth_states(auth_state_store.len().await);

    Ok(Redirect::temporary(&url))
}

async fn callback(
    State(config): State<ServerConfig>,
    State(auth_client): State<OptionalAuthClient>,
    State(auth_state_store): State<GuardedAuthStateStore>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, ApiError> {
    let auth_client = auth_client.ok_or_else(ApiError::credentials_not_configured)?;

    if let Some(error) = params.error {
        warn!("Authorization denied by provider: {}", error);
        return Err(ApiError::bad_request(format!(
            "Authorization failed: {}",
            error
        )));
    }
    let code = params
        .code
        .ok_or_else(|| ApiError::bad_request("Missing authorization code"))?;
    let state = params
        .state
        .ok_or_else(|| ApiError::bad_request("Missing state parameter"))?;

    let stored_state = auth_state_store
        .take(&state)
        .await
        .ok_or_else(|| ApiError::bad_request("Unknown or expired authorization state"))?;
    metrics::set_pending_auth_states(auth_state_store.len().await);

    let grant = match auth_client.exchange_code(&code, &state, &stored_state).await {
        Ok(grant) => {
            metrics::record_oauth_exchange("authorization_code", "ok");
            grant
        }
        Err(err) => {
            metrics::record_oauth_exchange("authorization_code", "error");
            warn!("Code exchange failed: {}", err);
            return Err(err.into());
        }
    };
    info!(
        "Authorization completed, access token {}",
        token_preview(&grant.access_token)
    );

    let redirect_url = format!(
        "{}/#access_token={}&refresh_token={}",
        config.frontend_url,
        urlencoding::encode(&grant.access_token),
        urlencoding::encode(grant.refresh_token.as_deref().unwrap_or_default())
    );
    Ok(Redirect::temporary(&redirect_url))
}

async fn refresh_token(
    State(auth_client): State<OptionalAuthClient>,
    Query(params): Query<RefreshParams>,
) -> Result<Json<Value>, ApiError> {
    let auth_client = auth_client.ok_or_else(ApiError::credentials_not_configured)?;
    let refresh_token = params
        .refresh_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing refresh_token"))?;

    match auth_client.refresh(&refresh_token).await {
        Ok(grant) => {
            metrics::record_oauth_exchange("refresh_token", "ok");
            let mut body = json!({ "access_token": grant.access_token });
            // The provider may rotate the refresh token.
            if let Some(rotated) = grant.refresh_token {
                body["refresh_token"] = Value::String(rotated);
            }
            Ok(Json(body))
        }
        Err(err) => {
            metrics::record_oauth_exchange("refresh_token", "error");
            warn!("Token refresh failed: {}", err);
            Err(ApiError::bad_request(format!(
                "Failed to refresh access token: {}",
                err
            )))
        }
    }
}

pub(super) fn make_auth_routes(state: ServerState) -> Router {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/refresh_token", get(refresh_token))
        .with_state(state)
}
