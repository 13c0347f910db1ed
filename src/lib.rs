//! SoundtrackGen: Spotify token broker and playlist proxy for a mood-based
//! playlist generator, plus the client library that drives the connect flow.

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod mood;
pub mod spotify;
pub mod store;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{router, AppState};

/// The full HTTP application with its middleware stack.
pub fn app(state: AppState) -> Router {
    router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
