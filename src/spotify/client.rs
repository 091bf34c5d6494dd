//! HTTP client for the Spotify Web API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::{body_to_value, parse_retry_after, SpotifyError};
use crate::feature_fetch::{FeatureFetchError, FeatureSource};
use crate::server::metrics;

pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Items of a playlist gathered across its pages.
#[derive(Debug, Clone, Default)]
pub struct PlaylistItems {
    pub items: Vec<Value>,
    pub pages_fetched: usize,
    /// True when pagination stopped early (page failure or page limit).
    pub truncated: bool,
}

/// Thin wrapper over the upstream endpoints used by the server.
///
/// Every call takes the caller's access token; the client itself holds no
/// user state and can be shared between requests.
pub struct SpotifyApi {
    client: reqwest::Client,
    base_url: String,
}

impl SpotifyApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(
        &self,
        access_token: &str,
        endpoint: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Value, SpotifyError> {
        debug!("GET {} ({})", url, endpoint);
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        metrics::record_upstream_call(endpoint, status.as_u16());

        if status.is_success() {
            return response
                .json::<Value>()
                .await
                .map_err(|e| SpotifyError::InvalidResponse(e.to_string()));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(response.headers());
            return Err(SpotifyError::RateLimited { retry_after });
        }

        let body = body_to_value(response.text().await.unwrap_or_default());
        if status == StatusCode::UNAUTHORIZED {
            Err(SpotifyError::Unauthorized { body })
        } else {
            Err(SpotifyError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// GET /me
    pub async fn current_user(&self, access_token: &str) -> Result<Value, SpotifyError> {
        let url = format!("{}/me", self.base_url);
        self.get_json(access_token, "me", &url, &[]).await
    }

    /// GET /me/playlists
    pub async fn user_playlists(&self, access_token: &str) -> Result<Value, SpotifyError> {
        let url = format!("{}/me/playlists", self.base_url);
        self.get_json(access_token, "playlists", &url, &[]).await
    }

    /// GET /me/player/recently-played
    pub async fn recently_played(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<Value, SpotifyError> {
        let url = format!("{}/me/player/recently-played", self.base_url);
        self.get_json(
            access_token,
            "recently_played",
            &url,
            &[("limit", limit.to_string())],
        )
        .await
    }

    /// GET /playlists/{id}, including the first page of its items.
    pub async fn playlist(&self, access_token: &str, id: &str) -> Result<Value, SpotifyError> {
        let url = format!("{}/playlists/{}", self.base_url, urlencoding::encode(id));
        self.get_json(access_token, "playlist", &url, &[]).await
    }

    /// Collect the items of an already fetched playlist, following `next`
    /// links for at most `max_pages` pages in total.
    ///
    /// A failing page ends pagination; the items gathered so far are kept.
    pub async fn playlist_items(
        &self,
        access_token: &str,
        playlist: &Value,
        max_pages: usize,
    ) -> PlaylistItems {
        let mut result = PlaylistItems::default();
        let Some(first_page) = playlist.get("tracks") else {
            return result;
        };

        append_page_items(&mut result.items, first_page);
        result.pages_fetched = 1;
        let mut next = next_page_url(first_page);

        while let Some(url) = next {
            if result.pages_fetched >= max_pages {
                warn!(
                    "Playlist pagination stopped after {} pages",
                    result.pages_fetched
                );
                result.truncated = true;
                break;
            }

            match self
                .get_json(access_token, "playlist_tracks", &url, &[])
                .await
            {
                Ok(page) => {
                    append_page_items(&mut result.items, &page);
                    result.pages_fetched += 1;
                    next = next_page_url(&page);
                }
                Err(err) => {
                    warn!("Failed to fetch playlist page {}: {}", url, err);
                    result.truncated = true;
                    break;
                }
            }
        }

        result
    }

    /// GET /audio-features?ids=…, aligned with `ids`.
    pub async fn audio_features(
        &self,
        access_token: &str,
        ids: &[String],
    ) -> Result<Vec<Option<Value>>, SpotifyError> {
        let url = format!("{}/audio-features", self.base_url);
        let body = self
            .get_json(access_token, "audio_features", &url, &[("ids", ids.join(","))])
            .await?;

        let records = body
            .get("audio_features")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                SpotifyError::InvalidResponse("missing audio_features array".to_string())
            })?;

        if records.len() != ids.len() {
            warn!(
                "Upstream returned {} feature records for {} ids",
                records.len(),
                ids.len()
            );
        }

        Ok(records
            .iter()
            .map(|r| if r.is_null() { None } else { Some(r.clone()) })
            .collect())
    }

    /// Bind an access token so the client can serve as a [`FeatureSource`].
    pub fn feature_source<'a>(&'a self, access_token: &'a str) -> TokenFeatureSource<'a> {
        TokenFeatureSource {
            api: self,
            access_token,
        }
    }
}

fn append_page_items(items: &mut Vec<Value>, page: &Value) {
    if let Some(page_items) = page.get("items").and_then(Value::as_array) {
        items.extend(page_items.iter().cloned());
    }
}

fn next_page_url(page: &Value) -> Option<String> {
    page.get("next")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub struct TokenFeatureSource<'a> {
    api: &'a SpotifyApi,
    access_token: &'a str,
}

#[async_trait]
impl FeatureSource for TokenFeatureSource<'_> {
    async fn fetch_batch(&self, ids: &[String]) -> Result<Vec<Option<Value>>, FeatureFetchError> {
        Ok(self.api.audio_features(self.access_token, ids).await?)
    }
}
