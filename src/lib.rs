//! Aurafy Server Library
//!
//! Playlist "aura" analysis on top of the Spotify Web API. The library
//! exposes the internal modules for the binaries and the end-to-end tests.

pub mod analysis;
pub mod config;
pub mod feature_fetch;
pub mod features;
pub mod mood;
pub mod oauth;
pub mod server;
pub mod spotify;
pub mod tracks;

// Re-export commonly used types for convenience
pub use analysis::{AnalysisService, AuraAnalysis};
pub use mood::{Classifier, MoodOutcome, MoodRule};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerState};
