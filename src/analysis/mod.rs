//! Playlist and listening-history analysis.
//!
//! Glues the upstream client to the feature pipeline: collect track ids,
//! fetch their features in batches, average and classify.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AnalysisSettings;
use crate::feature_fetch::{BatchFeatureFetcher, FeatureBatchResult, FeatureSource};
use crate::features::{aggregate, normalize_all, FeatureVector};
use crate::mood::{Classifier, MoodDescriptor, MoodOutcome, MoodRule, OutcomeKind};
use crate::server::metrics;
use crate::spotify::{SpotifyApi, SpotifyError};
use crate::tracks::collect_track_ids;

pub const RECENTLY_PLAYED_NAME: &str = "Recently Played";

/// The `analysis` object returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct AuraAnalysis {
    pub aura: MoodDescriptor,
    pub avg_features: FeatureVector,
    pub outcome: OutcomeKind,
    pub rule: Option<MoodRule>,
    /// Unique eligible tracks submitted for feature lookup.
    pub tracks_analyzed: usize,
    /// Records that contributed at least one recognized feature.
    pub features_found: usize,
    pub features_complete: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub analysis: AuraAnalysis,
    pub details: Value,
}

/// Classify raw feature records into an [`AuraAnalysis`].
pub fn analyze_records(
    classifier: &Classifier,
    records: &[Option<Value>],
    tracks_analyzed: usize,
    features_complete: bool,
) -> AuraAnalysis {
    let normalized = normalize_all(records);
    let features_found = normalized.iter().filter(|v| !v.is_empty()).count();
    let outcome = match aggregate(&normalized) {
        Some(avg) => classifier.classify(avg),
        None => MoodOutcome::NoData,
    };

    metrics::record_aura_outcome(&outcome);

    AuraAnalysis {
        aura: outcome.descriptor(),
        avg_features: outcome.avg_features(),
        outcome: outcome.kind(),
        rule: outcome.rule(),
        tracks_analyzed,
        features_found,
        features_complete,
    }
}

pub struct AnalysisService {
    api: Arc<SpotifyApi>,
    fetcher: BatchFeatureFetcher,
    classifier: Classifier,
    settings: AnalysisSettings,
}

impl AnalysisService {
    pub fn new(api: Arc<SpotifyApi>, classifier: Classifier, settings: AnalysisSettings) -> Self {
        let fetcher = BatchFeatureFetcher::new(settings.batch_size, settings.max_retry_delay());
        Self {
            api,
            fetcher,
            classifier,
            settings,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Fetch features for arbitrary ids, in batches.
    pub async fn fetch_features(&self, access_token: &str, ids: &[String]) -> FeatureBatchResult {
        let source = self.api.feature_source(access_token);
        self.fetcher.fetch_all(&source, ids).await
    }

    /// Core of both analyses, with the feature source injected.
    pub async fn analyze_items(&self, source: &dyn FeatureSource, items: &[Value]) -> AuraAnalysis {
        let ids = collect_track_ids(items, &self.settings.track_filter);
        if ids.is_empty() {
            info!("No eligible tracks among {} items", items.len());
        }

        let features = self.fetcher.fetch_all(source, &ids).await;
        if !features.complete {
            warn!(
                "Feature lookup incomplete: {} records for {} tracks",
                features.records.len(),
                ids.len()
            );
        }

        analyze_records(
            &self.classifier,
            &features.records,
            ids.len(),
            features.complete,
        )
    }

    pub async fn analyze_playlist(
        &self,
        access_token: &str,
        playlist_id: &str,
    ) -> Result<AnalysisResponse, SpotifyError> {
        let playlist = self.api.playlist(access_token, playlist_id).await?;
        let items = self
            .api
            .playlist_items(access_token, &playlist, self.settings.max_playlist_pages)
            .await;
        info!(
            "Playlist {} has {} items over {} pages",
            playlist_id,
            items.items.len(),
            items.pages_fetched
        );

        let source = self.api.feature_source(access_token);
        let analysis = self.analyze_items(&source, &items.items).await;

        Ok(AnalysisResponse {
            analysis,
            details: playlist,
        })
    }

    pub async fn analyze_recent(&self, access_token: &str) -> Result<AnalysisResponse, SpotifyError> {
        let recent = self
            .api
            .recently_played(access_token, self.settings.recent_limit)
            .await?;
        let items = recent
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let source = self.api.feature_source(access_token);
        let analysis = self.analyze_items(&source, &items).await;

        Ok(AnalysisResponse {
            analysis,
            details: json!({ "name": RECENTLY_PLAYED_NAME, "tracks": recent }),
        })
    }
}
