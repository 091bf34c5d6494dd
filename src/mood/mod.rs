//! Mood ("aura") classification of aggregate audio features.

mod classifier;
mod rules;

pub use classifier::{Classifier, MoodOutcome, OutcomeKind};
pub use rules::{MoodDescriptor, MoodRule, NO_DATA_DESCRIPTOR, NO_MATCH_DESCRIPTOR};
