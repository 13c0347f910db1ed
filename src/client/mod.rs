//! Client side of the connect flow.
//!
//! [`SpotifyService`] is what the front end talks to: it starts the OAuth
//! redirect, consumes the query string the callback sends back, keeps the
//! connection flag in client storage and generates playlists through the
//! backend proxy, degrading to mock data whenever the live path is unavailable.

mod backend;
mod connect;
mod context;
mod playlist;

use std::collections::HashMap;

pub use backend::BackendClient;
pub use connect::{has_auth_response, ConnectPhase, SpotifyService};
pub use context::{
    describe_weather_code, fallback_context, resolve_context, AmbientContext, ContextSources,
    Coordinates, GeocodeClient, Place, Weather, WeatherClient, DEFAULT_LOCATE_TIMEOUT,
};
pub use playlist::{mock_playlist, Mode, MoodContext, Playlist};

/// Storage key of the cached OAuth state.
pub const STATE_KEY: &str = "spotify_state";
/// Storage key of the connected flag.
pub const CONNECTED_KEY: &str = "spotify_connected";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Authorization was refused; carries the `error` value from the redirect.
    #[error("{0}")]
    Denied(String),

    #[error("Spotify not connected")]
    NotConnected,

    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} failed: {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("location unavailable: {0}")]
    Location(String),
}

/// Persistent key-value storage owned by the user agent.
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// Storage that lives as long as the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.items.insert(key.to_owned(), value.to_owned());
    }

    fn remove(&mut self, key: &str) {
        self.items.remove(key);
    }
}

/// Controls the user agent's location.
pub trait Navigator {
    /// Navigates the whole page away to `url`.
    fn assign(&mut self, url: &str);
    /// Rewrites the visible URL without navigating or adding a history entry.
    fn replace(&mut self, url: &str);
}
