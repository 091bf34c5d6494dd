//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per server endpoint. Redirects are not
//! followed so the OAuth hops can be inspected.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET without any token
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// GET with the token as `Authorization: Bearer`
    pub async fn get_with_token(&self, path: &str, token: &str) -> Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("GET request failed")
    }

    /// GET with the token as `access_token` query parameter
    pub async fn get_with_query_token(&self, path: &str, token: &str) -> Response {
        self.client
            .get(self.url(path))
            .query(&[("access_token", token)])
            .send()
            .await
            .expect("GET request failed")
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST request failed")
    }

    // ========================================================================
    // Auth Endpoints
    // ========================================================================

    /// GET /api/login
    pub async fn login(&self) -> Response {
        self.get("/api/login").await
    }

    /// GET /api/login, returning the `state` carried by the redirect
    pub async fn start_login(&self) -> String {
        let response = self.login().await;
        assert_eq!(response.status(), reqwest::StatusCode::TEMPORARY_REDIRECT);
        let location = location(&response);
        query_param(&location, "state").expect("Authorization URL has no state")
    }

    /// GET /api/callback with arbitrary query parameters
    pub async fn callback(&self, params: &[(&str, &str)]) -> Response {
        self.client
            .get(self.url("/api/callback"))
            .query(params)
            .send()
            .await
            .expect("Callback request failed")
    }

    /// GET /api/refresh_token
    pub async fn refresh(&self, refresh_token: &str) -> Response {
        self.client
            .get(self.url("/api/refresh_token"))
            .query(&[("refresh_token", refresh_token)])
            .send()
            .await
            .expect("Refresh request failed")
    }

    // ========================================================================
    // Pass-through Endpoints
    // ========================================================================

    /// GET /api/me
    pub async fn me(&self, token: &str) -> Response {
        self.get_with_token("/api/me", token).await
    }

    /// GET /api/playlists
    pub async fn playlists(&self, token: &str) -> Response {
        self.get_with_token("/api/playlists", token).await
    }

    /// GET /api/recently-played
    pub async fn recently_played(&self, token: &str, limit: Option<u32>) -> Response {
        let path = match limit {
            Some(limit) => format!("/api/recently-played?limit={}", limit),
            None => "/api/recently-played".to_string(),
        };
        self.get_with_token(&path, token).await
    }

    /// GET /api/playlist/{id}
    pub async fn playlist(&self, token: &str, id: &str) -> Response {
        self.get_with_token(&format!("/api/playlist/{}", id), token)
            .await
    }

    // ========================================================================
    // Analysis Endpoints
    // ========================================================================

    /// GET /api/analyze/playlist/{id}
    pub async fn analyze_playlist(&self, token: &str, id: &str) -> Response {
        self.get_with_token(&format!("/api/analyze/playlist/{}", id), token)
            .await
    }

    /// GET /api/analyze/recent
    pub async fn analyze_recent(&self, token: &str) -> Response {
        self.get_with_token("/api/analyze/recent", token).await
    }

    /// POST /api/audio_features
    pub async fn audio_features(&self, token: &str, ids: &[&str]) -> Response {
        self.post_json(
            "/api/audio_features",
            &json!({ "track_ids": ids, "access_token": token }),
        )
        .await
    }

    /// POST /api/calculate_aura
    pub async fn calculate_aura(&self, features_list: Value) -> Response {
        self.post_json(
            "/api/calculate_aura",
            &json!({ "features_list": features_list }),
        )
        .await
    }

    // ========================================================================
    // Debug Endpoints
    // ========================================================================

    /// GET /api/debug/test-token
    pub async fn debug_token(&self, token: &str) -> Response {
        self.get_with_token("/api/debug/test-token", token).await
    }

    /// GET /api/debug/test-playlist/{id}
    pub async fn debug_playlist(&self, token: &str, id: &str) -> Response {
        self.get_with_token(&format!("/api/debug/test-playlist/{}", id), token)
            .await
    }

    /// GET /api/debug/test-recent
    pub async fn debug_recent(&self, token: &str) -> Response {
        self.get_with_token("/api/debug/test-recent", token).await
    }
}

/// The `Location` header of a redirect response.
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .expect("Response has no Location header")
        .to_str()
        .expect("Location is not valid UTF-8")
        .to_string()
}

/// Decoded value of a query (or fragment) parameter in `url`.
pub fn query_param(url: &str, key: &str) -> Option<String> {
    let (_, params) = url.split_once(|c: char| c == '?' || c == '#')?;
    params.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        if k != key {
            return None;
        }
        urlencoding::decode(v).ok().map(|v| v.into_owned())
    })
}
