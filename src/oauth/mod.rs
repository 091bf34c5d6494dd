//! OAuth2 authorization-code flow against the Spotify accounts service.
//!
//! This module handles:
//! - Authorization URL generation with CSRF state and PKCE
//! - Token exchange (authorization code for tokens)
//! - Access token refresh
//! - Pending authorization state management

use anyhow::{Context, Result};
use openidconnect::{CsrfToken, PkceCodeChallenge};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::SpotifySettings;

/// Pending authorization states older than this are rejected and swept.
pub const AUTH_STATE_TTL_SECS: i64 = 300;

pub const DEFAULT_SCOPES: &[&str] = &[
    "user-read-private",
    "user-read-email",
    "user-read-recently-played",
    "playlist-read-private",
    "playlist-read-collaborative",
    "user-library-read",
];

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Spotify client credentials not configured")]
    NotConfigured,

    #[error("CSRF state mismatch")]
    StateMismatch,

    #[error("Authorization state expired")]
    StateExpired,

    #[error("Token endpoint returned {status}: {body}")]
    TokenRequest { status: u16, body: String },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// State stored during the authorization flow (between /login and /callback)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthState {
    /// CSRF token sent as `state`
    pub csrf_token: String,
    /// PKCE code verifier, never leaves the server
    pub pkce_verifier: String,
    /// Unix timestamp of creation
    pub created_at: i64,
}

impl AuthState {
    pub fn is_expired(&self, now: i64) -> bool {
        now - self.created_at > AUTH_STATE_TTL_SECS
    }
}

/// Token endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Short prefix of a secret that is safe to log.
pub fn token_preview(token: &str) -> String {
    let prefix: String = token.chars().take(10).collect();
    format!("{}...", prefix)
}

/// Client for the accounts service, built from the configured credentials.
pub struct SpotifyAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    authorize_url: String,
    token_url: String,
    scopes: Vec<String>,
}

impl SpotifyAuthClient {
    /// Returns `Ok(None)` when client credentials are not configured.
    pub fn from_settings(settings: &SpotifySettings, timeout: Duration) -> Result<Option<Self>> {
        let (Some(client_id), Some(client_secret)) =
            (settings.client_id.clone(), settings.client_secret.clone())
        else {
            return Ok(None);
        };

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to create HTTP client")?;

        let accounts = settings.accounts_base_url.trim_end_matches('/');
        info!("OAuth client configured for {}", accounts);

        Ok(Some(Self {
            http,
            client_id,
            client_secret,
            redirect_uri: settings.redirect_uri.clone(),
            authorize_url: format!("{}/authorize", accounts),
            token_url: format!("{}/api/token", accounts),
            scopes: settings.scopes.clone(),
        }))
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Generate the URL the user is redirected to, along with the state that
    /// must be stored and checked when the callback comes in.
    pub fn authorize_url(&self) -> (String, AuthState) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let csrf_token = CsrfToken::new_random();

        let scope = self.scopes.join(" ");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("scope", scope.as_str()),
            ("state", csrf_token.secret().as_str()),
            ("code_challenge_method", "S256"),
            ("code_challenge", pkce_challenge.as_str()),
            ("show_dialog", "true"),
        ];
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let state = AuthState {
            csrf_token: csrf_token.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
            created_at: chrono::Utc::now().timestamp(),
        };

        debug!("Generated authorization URL with state: {}", state.csrf_token);

        (format!("{}?{}", self.authorize_url, query), state)
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &str,
        stored_state: &AuthState,
    ) -> Result<TokenGrant, OAuthError> {
        if state != stored_state.csrf_token {
            return Err(OAuthError::StateMismatch);
        }
        if stored_state.is_expired(chrono::Utc::now().timestamp()) {
            return Err(OAuthError::StateExpired);
        }

        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code_verifier", stored_state.pkce_verifier.as_str()),
        ])
        .await
    }

    /// Get a fresh access token from a refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, OAuthError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenGrant, OAuthError> {
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::TokenRequest {
                status: status.as_u16(),
                body,
            });
        }

        let grant: TokenGrant = response.json().await?;
        debug!(
            "Token endpoint issued access token {}",
            token_preview(&grant.access_token)
        );
        Ok(grant)
    }
}

/// In-memory storage for pending authorization states, keyed by CSRF token.
pub struct AuthStateStore {
    states: RwLock<HashMap<String, AuthState>>,
}

impl AuthStateStore {
    pub fn new() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
        }
    }

    pub async fn store(&self, state: AuthState) {
        let key = state.csrf_token.clone();
        self.states.write().await.insert(key, state);
    }

    /// Retrieve and remove a state
    pub async fn take(&self, csrf_token: &str) -> Option<AuthState> {
        self.states.write().await.remove(csrf_token)
    }

    /// Drop expired states, returning how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = chrono::Utc::now().timestamp();
        let mut states = self.states.write().await;
        let before = states.len();
        states.retain(|_, state| !state.is_expired(now));
        before - states.len()
    }

    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }
}

impl Default for AuthStateStore {
    fn default() -> Self {
        Self::new()
    }
}
