mod access_token;
mod analysis_routes;
pub mod api_error;
mod auth_routes;
pub mod config;
mod debug_routes;
mod http_layers;
pub mod metrics;
pub mod server;
mod spotify_routes;
pub mod state;

pub use access_token::AccessToken;
pub use api_error::ApiError;
pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
pub use state::ServerState;
