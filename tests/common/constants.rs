//! Shared constants for end-to-end tests
//!
//! Fixture ids, tokens and timeouts used by both the fake upstream and the
//! tests. When the fixture data changes, update only this file.

// ============================================================================
// Tokens and OAuth
// ============================================================================

/// Access token the fake upstream accepts
pub const VALID_TOKEN: &str = "valid-access-token-0123456789";

/// Access token the fake upstream rejects with 401
pub const EXPIRED_TOKEN: &str = "expired-access-token-9876543210";

/// Authorization code the fake token endpoint accepts
pub const AUTH_CODE: &str = "AQD-test-authorization-code";

/// Refresh token issued with the code exchange
pub const REFRESH_TOKEN: &str = "test-refresh-token-abcdef";

/// Access token issued on refresh
pub const REFRESHED_TOKEN: &str = "refreshed-access-token-555";

/// Refresh token issued when the fake upstream is told to rotate it
pub const ROTATED_REFRESH_TOKEN: &str = "rotated-refresh-token-777";

pub const TEST_CLIENT_ID: &str = "test-client-id";
pub const TEST_CLIENT_SECRET: &str = "test-client-secret";

/// Frontend the callback redirects to
pub const FRONTEND_URL: &str = "http://localhost:3000";

// ============================================================================
// Catalog fixtures
// ============================================================================

/// Playlist with three dance tracks over two pages plus a local file
pub const DANCE_PLAYLIST_ID: &str = "37i9dQZF1DXcBWIGoYBM5M";

/// Playlist without any items
pub const EMPTY_PLAYLIST_ID: &str = "5ABHKGoOzxkaa28ttQV9sE";

/// Playlist the fake upstream doesn't know
pub const MISSING_PLAYLIST_ID: &str = "0000000000000000000000";

pub const DANCE_TRACK_1_ID: &str = "4uLU6hMCjMI75M1A2tKUQC";
pub const DANCE_TRACK_2_ID: &str = "7ouMYWpwJ422jRcDASZB7P";
pub const DANCE_TRACK_3_ID: &str = "0VjIjW4GlUZAMYd2vXMi3b";

pub const MELLOW_TRACK_1_ID: &str = "3n3Ppam7vgaVa1iaRUc9Lp";
pub const MELLOW_TRACK_2_ID: &str = "1301WleyT98MSxVHPZCA6M";

/// Well-formed id the feature endpoint answers `null` for
pub const FEATURELESS_TRACK_ID: &str = "6rqhFgbbKwnb9MLmUQDhG6";

pub const TEST_USER_ID: &str = "aura-tester";
pub const TEST_USER_NAME: &str = "Aura Tester";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
