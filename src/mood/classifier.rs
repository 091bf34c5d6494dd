use serde::Serialize;

use super::rules::{MoodDescriptor, MoodRule, NO_DATA_DESCRIPTOR, NO_MATCH_DESCRIPTOR};
use crate::features::{aggregate, normalize_all, FeatureVector};
use serde_json::Value;

/// Result of classifying a set of tracks.
#[derive(Debug, Clone, PartialEq)]
pub enum MoodOutcome {
    Matched {
        rule: MoodRule,
        avg_features: FeatureVector,
    },
    NoMatch {
        avg_features: FeatureVector,
    },
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Matched,
    NoMatch,
    NoData,
}

impl MoodOutcome {
    pub fn descriptor(&self) -> MoodDescriptor {
        match self {
            MoodOutcome::Matched { rule, .. } => rule.descriptor(),
            MoodOutcome::NoMatch { .. } => NO_MATCH_DESCRIPTOR,
            MoodOutcome::NoData => NO_DATA_DESCRIPTOR,
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            MoodOutcome::Matched { .. } => OutcomeKind::Matched,
            MoodOutcome::NoMatch { .. } => OutcomeKind::NoMatch,
            MoodOutcome::NoData => OutcomeKind::NoData,
        }
    }

    pub fn rule(&self) -> Option<MoodRule> {
        match self {
            MoodOutcome::Matched { rule, .. } => Some(*rule),
            _ => None,
        }
    }

    /// The aggregate vector, empty for [`MoodOutcome::NoData`].
    pub fn avg_features(&self) -> FeatureVector {
        match self {
            MoodOutcome::Matched { avg_features, .. } | MoodOutcome::NoMatch { avg_features } => {
                avg_features.clone()
            }
            MoodOutcome::NoData => FeatureVector::new(),
        }
    }
}

/// First-match classifier over an ordered rule table.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<MoodRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(MoodRule::DEFAULT_ORDER.to_vec())
    }
}

impl Classifier {
    pub fn new(rules: Vec<MoodRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[MoodRule] {
        &self.rules
    }

    /// Classify an already aggregated vector.
    pub fn classify(&self, avg_features: FeatureVector) -> MoodOutcome {
        if avg_features.is_empty() {
            return MoodOutcome::NoData;
        }

        match self.rules.iter().find(|rule| rule.matches(&avg_features)) {
            Some(rule) => MoodOutcome::Matched {
                rule: *rule,
                avg_features,
            },
            None => MoodOutcome::NoMatch { avg_features },
        }
    }

    /// Normalize, aggregate and classify raw feature records.
    pub fn classify_records(&self, records: &[Option<Value>]) -> MoodOutcome {
        match aggregate(&normalize_all(records)) {
            Some(avg_features) => self.classify(avg_features),
            None => MoodOutcome::NoData,
        }
    }
}
