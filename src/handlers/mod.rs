//! HTTP handlers for the token broker and recommendation proxy.

mod auth;
mod proxy;

use std::sync::Arc;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use crate::config::Config;
use crate::spotify::SpotifyClient;
use crate::store::TokenStore;

pub use auth::{callback, login, CallbackParams, LoginParams};
pub use proxy::{create_playlist, logout, recommendations};

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub spotify: SpotifyClient,
    pub tokens: Arc<dyn TokenStore>,
}

impl AppState {
    pub fn new(config: Config, tokens: Arc<dyn TokenStore>) -> Self {
        let spotify = SpotifyClient::new(config.accounts_url.clone(), config.api_url.clone());
        Self {
            config: Arc::new(config),
            spotify,
            tokens,
        }
    }
}

/// GET /health - Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}

/// `302 Found` to `location`.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/api/spotify/recommendations", post(recommendations))
        .route("/api/spotify/create-playlist", post(create_playlist))
        .route("/api/spotify/logout", post(logout))
}
