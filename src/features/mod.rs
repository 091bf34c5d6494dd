//! Audio feature vectors.
//!
//! Raw feature records come from the upstream catalog as loosely typed JSON
//! objects (or `null` when the catalog has nothing for a track). This module
//! reduces them to a fixed vocabulary of numeric attributes and averages them
//! across a set of tracks.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The fixed vocabulary of audio attributes used for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Danceability,
    Energy,
    Valence,
    Acousticness,
    Instrumentalness,
    Tempo,
}

impl Feature {
    pub const ALL: [Feature; 6] = [
        Feature::Danceability,
        Feature::Energy,
        Feature::Valence,
        Feature::Acousticness,
        Feature::Instrumentalness,
        Feature::Tempo,
    ];

    /// Key of this feature in upstream feature records.
    pub fn key(&self) -> &'static str {
        match self {
            Feature::Danceability => "danceability",
            Feature::Energy => "energy",
            Feature::Valence => "valence",
            Feature::Acousticness => "acousticness",
            Feature::Instrumentalness => "instrumentalness",
            Feature::Tempo => "tempo",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A sparse mapping from feature to value.
///
/// Used both for a single normalized track record and for the aggregate
/// (averaged) vector of a set of tracks. Features that are not known are
/// simply absent, never zero-filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(BTreeMap<Feature, f64>);

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, feature: Feature) -> Option<f64> {
        self.0.get(&feature).copied()
    }

    pub fn insert(&mut self, feature: Feature, value: f64) {
        self.0.insert(feature, value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        self.0.iter().map(|(f, v)| (*f, *v))
    }
}

impl FromIterator<(Feature, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (Feature, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Reduce a raw feature record to the recognized, numeric features it carries.
///
/// `None`, JSON `null`, non-object values, unknown keys and non-numeric values
/// all contribute nothing. Values are passed through untouched.
pub fn normalize(record: Option<&Value>) -> FeatureVector {
    let Some(object) = record.and_then(Value::as_object) else {
        return FeatureVector::new();
    };

    Feature::ALL
        .iter()
        .filter_map(|feature| {
            object
                .get(feature.key())
                .and_then(Value::as_f64)
                .map(|value| (*feature, value))
        })
        .collect()
}

/// Normalize a list of raw records, absent ones included.
pub fn normalize_all(records: &[Option<Value>]) -> Vec<FeatureVector> {
    records.iter().map(|r| normalize(r.as_ref())).collect()
}

/// Field-wise arithmetic mean over the vectors that define each field.
///
/// A vector lacking a feature does not count towards that feature's
/// denominator. Features defined by no vector are omitted. Returns `None`
/// when nothing could be averaged at all, which callers treat as "no
/// analyzable data".
pub fn aggregate(vectors: &[FeatureVector]) -> Option<FeatureVector> {
    let averaged: FeatureVector = Feature::ALL
        .iter()
        .filter_map(|feature| {
            let (sum, count) = vectors
                .iter()
                .filter_map(|v| v.get(*feature))
                .fold((0.0f64, 0usize), |(sum, count), value| (sum + value, count + 1));
            (count > 0).then(|| (*feature, sum / count as f64))
        })
        .collect();

    if averaged.is_empty() {
        None
    } else {
        Some(averaged)
    }
}
