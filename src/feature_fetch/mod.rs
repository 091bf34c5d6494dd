//! Batched retrieval of raw audio-feature records.
//!
//! The upstream lookup accepts a limited number of identifiers per call, so
//! identifiers are split into consecutive batches that are requested one
//! after the other. A rate-limited batch is retried once after the hinted
//! delay; any other failure ends the run and whatever was gathered so far is
//! returned.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::server::metrics;

/// Hard upstream limit of identifiers per feature lookup.
pub const MAX_BATCH_SIZE: usize = 100;

/// Delay used when a rate-limited response carries no hint.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum FeatureFetchError {
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Feature lookup failed: {0}")]
    Failed(String),
}

/// Something that can resolve a batch of track identifiers to raw feature
/// records, positionally aligned with the input (`None` for unknown tracks).
#[async_trait]
pub trait FeatureSource: Send + Sync {
    async fn fetch_batch(&self, ids: &[String]) -> Result<Vec<Option<Value>>, FeatureFetchError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureBatchResult {
    pub records: Vec<Option<Value>>,
    /// False when a batch failed and later batches were never requested.
    pub complete: bool,
    pub batches_requested: usize,
}

#[derive(Debug, Clone)]
pub struct BatchFeatureFetcher {
    batch_size: usize,
    max_retry_delay: Duration,
}

impl Default for BatchFeatureFetcher {
    fn default() -> Self {
        Self::new(MAX_BATCH_SIZE, Duration::from_secs(30))
    }
}

impl BatchFeatureFetcher {
    /// `batch_size` is clamped to `1..=MAX_BATCH_SIZE`.
    pub fn new(batch_size: usize, max_retry_delay: Duration) -> Self {
        Self {
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
            max_retry_delay,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn retry_delay(&self, hint: Option<Duration>) -> Duration {
        hint.unwrap_or(DEFAULT_RETRY_DELAY).min(self.max_retry_delay)
    }

    pub async fn fetch_all(&self, source: &dyn FeatureSource, ids: &[String]) -> FeatureBatchResult {
        let mut result = FeatureBatchResult {
            records: Vec::with_capacity(ids.len()),
            complete: true,
            batches_requested: 0,
        };

        for (index, batch) in ids.chunks(self.batch_size).enumerate() {
            debug!("Requesting feature batch {} ({} ids)", index, batch.len());
            result.batches_requested += 1;

            let outcome = match source.fetch_batch(batch).await {
                Err(FeatureFetchError::RateLimited { retry_after }) => {
                    let delay = self.retry_delay(retry_after);
                    warn!(
                        "Feature batch {} rate limited, retrying once in {:?}",
                        index, delay
                    );
                    metrics::record_rate_limit_hit("audio_features");
                    tokio::time::sleep(delay).await;
                    result.batches_requested += 1;
                    source.fetch_batch(batch).await
                }
                other => other,
            };

            match outcome {
                Ok(records) => {
                    metrics::record_feature_batch("ok");
                    result.records.extend(records);
                }
                Err(err) => {
                    metrics::record_feature_batch("failed");
                    warn!(
                        "Stopping feature lookup at batch {}: {}. Returning {} partial records",
                        index,
                        err,
                        result.records.len()
                    );
                    result.complete = false;
                    break;
                }
            }
        }

        info!(
            "Fetched {} feature records for {} ids in {} requests",
            result.records.len(),
            ids.len(),
            result.batches_requested
        );
        result
    }
}
