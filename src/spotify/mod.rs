mod client;
mod error;

pub use client::{PlaylistItems, SpotifyApi, TokenFeatureSource, DEFAULT_API_BASE_URL};
pub use error::{parse_retry_after, SpotifyError};
