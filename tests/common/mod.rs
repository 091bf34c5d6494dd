//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, VALID_TOKEN};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_get_me() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.me(VALID_TOKEN).await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

mod client;
mod constants;
mod mock_spotify;
mod server;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use client::{location, query_param, TestClient};
pub use constants::*;
#[allow(unused_imports)]
pub use mock_spotify::MockSpotify;
pub use server::TestServer;
