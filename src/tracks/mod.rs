//! Track collection from playlist and listening-history items.
//!
//! Upstream payloads are lists of items that each may or may not carry a
//! nested `track` object. Items that can't be analyzed are skipped silently;
//! collecting never fails.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

lazy_static! {
    static ref TRACK_ID_RE: Regex = Regex::new("^[0-9A-Za-z]{22}$").unwrap();
}

/// Length of a catalog track identifier.
pub const TRACK_ID_LEN: usize = 22;

/// Whether `id` has the shape of a catalog track identifier.
pub fn is_valid_track_id(id: &str) -> bool {
    TRACK_ID_RE.is_match(id)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRef {
    pub name: Option<String>,
}

/// The nested track object of a playlist or history item.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackReference {
    pub id: Option<String>,
    pub name: Option<String>,
    pub artists: Vec<ArtistRef>,
    pub duration_ms: Option<u64>,
    pub popularity: Option<u32>,
    pub is_local: bool,
    pub is_playable: Option<bool>,
    /// `track` or `episode`.
    pub item_type: Option<String>,
}

impl TrackReference {
    /// Extract the nested track of an item, if it has a usable one.
    ///
    /// Display fields of an unexpected type read as absent.
    pub fn from_item(item: &Value) -> Option<Self> {
        let track = item.get("track")?.as_object()?;
        let text = |key: &str| track.get(key).and_then(Value::as_str).map(str::to_string);
        let flag = |key: &str| track.get(key).and_then(Value::as_bool);

        let artists = track
            .get("artists")
            .and_then(Value::as_array)
            .map(|artists| {
                artists
                    .iter()
                    .map(|artist| ArtistRef {
                        name: artist.get("name").and_then(Value::as_str).map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            id: text("id"),
            name: text("name"),
            artists,
            duration_ms: track.get("duration_ms").and_then(Value::as_u64),
            popularity: track
                .get("popularity")
                .and_then(Value::as_u64)
                .and_then(|p| u32::try_from(p).ok()),
            is_local: flag("is_local").unwrap_or(false),
            is_playable: flag("is_playable"),
            item_type: text("type"),
        })
    }

    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .filter_map(|a| a.name.as_deref())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn is_track_type(&self) -> bool {
        self.item_type.as_deref() == Some("track")
    }
}

/// Which track items are eligible for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackFilterPolicy {
    /// Keep local files (they never have audio features upstream).
    pub include_local: bool,
    /// Only keep items whose `type` is `track` (drops podcast episodes).
    pub require_track_type: bool,
    /// Only keep identifiers of the catalog id shape.
    pub require_valid_id: bool,
}

impl Default for TrackFilterPolicy {
    fn default() -> Self {
        Self {
            include_local: false,
            require_track_type: true,
            require_valid_id: true,
        }
    }
}

impl TrackFilterPolicy {
    /// Keeps anything with a non-null id.
    pub fn permissive() -> Self {
        Self {
            include_local: true,
            require_track_type: false,
            require_valid_id: false,
        }
    }

    fn accepts(&self, track: &TrackReference) -> bool {
        let Some(id) = track.id.as_deref() else {
            return false;
        };
        if self.require_valid_id && !is_valid_track_id(id) {
            return false;
        }
        if self.require_track_type && !track.is_track_type() {
            return false;
        }
        if !self.include_local && track.is_local {
            return false;
        }
        true
    }
}

/// Parse every item into its nested track, skipping malformed items.
pub fn track_references(items: &[Value]) -> Vec<TrackReference> {
    items.iter().filter_map(TrackReference::from_item).collect()
}

/// Unique track identifiers accepted by `policy`, in first-seen order.
pub fn collect_track_ids(items: &[Value], policy: &TrackFilterPolicy) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(TrackReference::from_item)
        .filter(|track| policy.accepts(track))
        .filter_map(|track| track.id)
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Split identifiers into well-formed and malformed ones.
pub fn partition_by_validity(ids: &[String]) -> (Vec<String>, Vec<String>) {
    ids.iter().cloned().partition(|id| is_valid_track_id(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const A: &str = "4uLU6hMCjMI75M1A2tKUQC";
    const B: &str = "7ouMYWpwJ422jRcDASZB7P";
    const C: &str = "0VjIjW4GlUZAMYd2vXMi3b";

    fn item(id: &str) -> Value {
        json!({ "track": { "id": id, "name": format!("Song {}", id), "type": "track", "is_local": false } })
    }

    #[test]
    fn deduplicates_preserving_first_seen_order() {
        let items = vec![item(A), item(B), item(A), item(C)];
        let ids = collect_track_ids(&items, &TrackFilterPolicy::default());
        assert_eq!(ids, vec![A, B, C]);
    }

    #[test]
    fn skips_malformed_items() {
        let items = vec![
            Value::Null,
            json!({}),
            json!({ "track": null }),
            json!({ "track": { "id": null, "type": "track" } }),
            json!({ "track": "not an object" }),
            json!({ "track": { "id": 42, "type": "track" } }),
            item(A),
        ];
        let ids = collect_track_ids(&items, &TrackFilterPolicy::default());
        assert_eq!(ids, vec![A]);
    }

    #[test]
    fn default_policy_excludes_local_episodes_and_bad_ids() {
        let items = vec![
            json!({ "track": { "id": B, "type": "track", "is_local": true } }),
            json!({ "track": { "id": C, "type": "episode" } }),
            json!({ "track": { "id": "short", "type": "track" } }),
            item(A),
        ];
        let ids = collect_track_ids(&items, &TrackFilterPolicy::default());
        assert_eq!(ids, vec![A]);
    }

    #[test]
    fn permissive_policy_keeps_everything_with_an_id() {
        let items = vec![
            json!({ "track": { "id": B, "type": "track", "is_local": true } }),
            json!({ "track": { "id": C, "type": "episode" } }),
            json!({ "track": { "id": "short" } }),
            json!({ "track": { "id": null } }),
        ];
        let ids = collect_track_ids(&items, &TrackFilterPolicy::permissive());
        assert_eq!(ids, vec![B, C, "short"]);
    }

    #[test]
    fn odd_display_metadata_keeps_the_id() {
        let items = vec![
            json!({ "track": { "id": A, "type": "track", "artists": null } }),
            json!({ "track": { "id": B, "type": "track", "is_local": null } }),
            json!({ "track": { "id": C, "type": "track", "popularity": -1, "duration_ms": "long" } }),
        ];
        let ids = collect_track_ids(&items, &TrackFilterPolicy::default());
        assert_eq!(ids, vec![A, B, C]);

        let track = TrackReference::from_item(&items[2]).unwrap();
        assert_eq!(track.popularity, None);
        assert_eq!(track.duration_ms, None);
        assert!(track.artists.is_empty());
    }

    #[test]
    fn track_id_validity() {
        assert!(is_valid_track_id(A));
        assert!(!is_valid_track_id(""));
        assert!(!is_valid_track_id("4uLU6hMCjMI75M1A2tKUQ"));
        assert!(!is_valid_track_id("4uLU6hMCjMI75M1A2tKUQCX"));
        assert!(!is_valid_track_id("4uLU6hMCjMI75M1A2tKU-C"));
        assert_eq!(A.len(), TRACK_ID_LEN);
    }

    #[test]
    fn partition_splits_ids() {
        let ids = vec![A.to_string(), "bad".to_string(), B.to_string()];
        let (valid, invalid) = partition_by_validity(&ids);
        assert_eq!(valid, vec![A, B]);
        assert_eq!(invalid, vec!["bad"]);
    }

    #[test]
    fn track_reference_display_metadata() {
        let raw = json!({
            "played_at": "2024-01-01T00:00:00Z",
            "track": {
                "id": A,
                "name": "Never Gonna Give You Up",
                "artists": [{ "name": "Rick Astley" }, { "name": "Someone Else" }],
                "duration_ms": 213573,
                "popularity": 80,
                "is_playable": true,
                "type": "track"
            }
        });
        let track = TrackReference::from_item(&raw).unwrap();
        assert_eq!(track.name.as_deref(), Some("Never Gonna Give You Up"));
        assert_eq!(track.artist_names(), "Rick Astley, Someone Else");
        assert_eq!(track.duration_ms, Some(213573));
        assert_eq!(track.popularity, Some(80));
        assert!(!track.is_local);
        assert_eq!(track.is_playable, Some(true));
        assert!(track.is_track_type());
    }
}
