//! Mood rule table.
//!
//! Each rule is an identifier with a pure predicate over an aggregate
//! [`FeatureVector`] and a separate presentation record. Evaluation never
//! fails: a predicate that needs a feature the vector doesn't carry simply
//! doesn't match.

use serde::Serialize;

use crate::features::{Feature, FeatureVector};

/// Display data for a mood, as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoodDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub color: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodRule {
    HighEnergyDanceParty,
    MelancholicIntrospection,
    UpbeatAndHappy,
    AcousticCafe,
    EnergeticAndAngry,
    LateNightDrive,
}

impl MoodRule {
    /// Standard evaluation order.
    pub const DEFAULT_ORDER: [MoodRule; 6] = [
        MoodRule::HighEnergyDanceParty,
        MoodRule::MelancholicIntrospection,
        MoodRule::UpbeatAndHappy,
        MoodRule::AcousticCafe,
        MoodRule::EnergeticAndAngry,
        MoodRule::LateNightDrive,
    ];

    pub fn matches(&self, v: &FeatureVector) -> bool {
        self.evaluate(v).unwrap_or(false)
    }

    /// `None` when a required feature is missing.
    fn evaluate(&self, v: &FeatureVector) -> Option<bool> {
        let danceability = || v.get(Feature::Danceability);
        let energy = || v.get(Feature::Energy);
        let valence = || v.get(Feature::Valence);
        let acousticness = || v.get(Feature::Acousticness);
        let instrumentalness = || v.get(Feature::Instrumentalness);

        let result = match self {
            MoodRule::HighEnergyDanceParty => danceability()? > 0.7 && energy()? > 0.7,
            MoodRule::MelancholicIntrospection => valence()? < 0.4 && energy()? < 0.5,
            MoodRule::UpbeatAndHappy => valence()? > 0.7 && energy()? > 0.6,
            MoodRule::AcousticCafe => acousticness()? > 0.6 && energy()? < 0.5,
            MoodRule::EnergeticAndAngry => energy()? > 0.8 && valence()? < 0.3,
            MoodRule::LateNightDrive => {
                energy()? > 0.6 && danceability()? > 0.6 && instrumentalness()? > 0.5
            }
        };
        Some(result)
    }

    pub fn descriptor(&self) -> MoodDescriptor {
        match self {
            MoodRule::HighEnergyDanceParty => MoodDescriptor {
                name: "High-Energy Dance Party",
                description: "This playlist is a non-stop dance party! Perfect for a workout or a night out.",
                color: "#FF5722",
            },
            MoodRule::MelancholicIntrospection => MoodDescriptor {
                name: "Melancholic Introspection",
                description: "This playlist is perfect for a rainy day, with its mellow and introspective vibe.",
                color: "#42A5F5",
            },
            MoodRule::UpbeatAndHappy => MoodDescriptor {
                name: "Upbeat & Happy",
                description: "This playlist is full of positive vibes and will be sure to put a smile on your face.",
                color: "#FFCA28",
            },
            MoodRule::AcousticCafe => MoodDescriptor {
                name: "Acoustic Cafe",
                description: "This playlist is perfect for a chill afternoon at a coffee shop, with its acoustic and relaxed feel.",
                color: "#8D6E63",
            },
            MoodRule::EnergeticAndAngry => MoodDescriptor {
                name: "Energetic & Angry",
                description: "This playlist is full of raw power and aggression, perfect for a workout or when you need to let off some steam.",
                color: "#B71C1C",
            },
            MoodRule::LateNightDrive => MoodDescriptor {
                name: "Late Night Drive",
                description: "This playlist is the perfect soundtrack for a late-night drive, with its atmospheric and electronic sound.",
                color: "#7E57C2",
            },
        }
    }
}

/// Shown when the aggregate vector matched none of the rules.
pub const NO_MATCH_DESCRIPTOR: MoodDescriptor = MoodDescriptor {
    name: "The Eclectic Mixmaster",
    description: "Your taste is all over the place! You've got a little bit of everything in there.",
    color: "#9E9E9E",
};

/// Shown when there were no audio features to analyze at all.
pub const NO_DATA_DESCRIPTOR: MoodDescriptor = MoodDescriptor {
    name: "The Mysterious Void",
    description: "We couldn't find any audio features. Is this playlist just a figment of your imagination?",
    color: "#9E9E9E",
};
