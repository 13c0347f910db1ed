use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};

use super::{ClientError, Navigator, SpotifyService, Storage, Weather};
use crate::models::{
    format_duration, PlaylistRef, Track, DEFAULT_MARKET, DEFAULT_MOOD,
    DEFAULT_PLAYLIST_DESCRIPTION, DEFAULT_TIME_OF_DAY,
};

/// Whether generation may use the live backend path at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Live,
    /// Every generation is served from mock data.
    Degraded,
}

/// What the user told us, plus the ambient context.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodContext {
    pub mood: String,
    pub time_of_day: String,
    pub weather: Weather,
    pub location: String,
}

/// A generated playlist as handed to the dashboard.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub mood: String,
    pub time: String,
    pub weather: Weather,
    pub location: String,
    pub tracks: Vec<Track>,
    pub cover_image: String,
    pub created_at: String,
    pub spotify_playlist_id: Option<String>,
    pub spotify_playlist_url: Option<String>,
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn today() -> String {
    Local::now().format("%-m/%-d/%Y").to_string()
}

fn fallback_track(id: &str, name: &str, artist: &str, album: &str, ms: u64, image: &str) -> Track {
    Track {
        id: id.into(),
        uri: String::new(),
        name: name.into(),
        artist: artist.into(),
        album: album.into(),
        duration_ms: ms,
        image: image.into(),
        duration: format_duration(ms),
    }
}

/// Playlist built entirely from fallback tracks.
pub fn mock_playlist(ctx: &MoodContext) -> Playlist {
    let tracks = vec![
        fallback_track(
            "mock-1",
            "City Lights",
            "Analog Dreams",
            "Neon Nights",
            222_000,
            "https://images.unsplash.com/photo-1516280440614-37939bbacd81?w=300&h=300&fit=crop",
        ),
        fallback_track(
            "mock-2",
            "Morning Glow",
            "Golden Hour",
            "Sunrise Stories",
            245_000,
            "https://images.unsplash.com/photo-1498050108023-c5249f4df085?w=300&h=300&fit=crop",
        ),
    ];

    Playlist {
        id: Utc::now().timestamp_millis().to_string(),
        name: format!("{} Soundtrack - {}", capitalize(&ctx.mood), today()),
        mood: ctx.mood.clone(),
        time: ctx.time_of_day.clone(),
        weather: ctx.weather.clone(),
        location: ctx.location.clone(),
        cover_image: tracks[0].image.clone(),
        tracks,
        created_at: Utc::now().to_rfc3339(),
        spotify_playlist_id: None,
        spotify_playlist_url: None,
    }
}

impl<S: Storage, N: Navigator> SpotifyService<S, N> {
    pub fn mode(&self) -> Mode {
        if self.connected {
            Mode::Live
        } else {
            Mode::Degraded
        }
    }

    /// Generates a playlist for `ctx`. Never fails: every failure on the live
    /// path degrades to the mock playlist.
    pub async fn generate_playlist(&self, mut ctx: MoodContext) -> Playlist {
        if ctx.mood.is_empty() {
            ctx.mood = DEFAULT_MOOD.into();
        }
        if ctx.time_of_day.is_empty() {
            ctx.time_of_day = DEFAULT_TIME_OF_DAY.into();
        }

        if self.mode() == Mode::Degraded {
            tracing::info!("spotify not connected, using mock playlist");
            return mock_playlist(&ctx);
        }

        let tracks = match self
            .backend
            .recommendations(
                self.session_state.as_deref(),
                &ctx.mood,
                &ctx.time_of_day,
                DEFAULT_MARKET,
            )
            .await
        {
            Ok(tracks) if !tracks.is_empty() => tracks,
            Ok(_) => {
                tracing::warn!("no tracks from backend, using mock playlist");
                return mock_playlist(&ctx);
            }
            Err(e) => {
                tracing::warn!("recommendations failed, using mock playlist: {}", e);
                return mock_playlist(&ctx);
            }
        };

        let mut playlist = Playlist {
            id: Utc::now().timestamp_millis().to_string(),
            name: format!(
                "{} {} Soundtrack - {}",
                capitalize(&ctx.mood),
                capitalize(&ctx.time_of_day),
                today()
            ),
            mood: ctx.mood,
            time: ctx.time_of_day,
            weather: ctx.weather,
            location: if ctx.location.is_empty() {
                "Unknown".into()
            } else {
                ctx.location
            },
            cover_image: tracks[0].image.clone(),
            tracks,
            created_at: Utc::now().to_rfc3339(),
            spotify_playlist_id: None,
            spotify_playlist_url: None,
        };

        if playlist.tracks[0].uri.is_empty() {
            return playlist;
        }

        match self.create_remote(&playlist).await {
            Ok(remote) => {
                playlist.spotify_playlist_id = Some(remote.playlist_id);
                playlist.spotify_playlist_url = Some(remote.playlist_url);
            }
            Err(e) => {
                tracing::warn!("creating spotify playlist failed, continuing without it: {}", e)
            }
        }
        playlist
    }

    /// Saves an already generated playlist to the user's Spotify account.
    pub async fn save_playlist_to_spotify(
        &self,
        playlist: &Playlist,
    ) -> Result<PlaylistRef, ClientError> {
        if !self.connected {
            return Err(ClientError::NotConnected);
        }
        self.create_remote(playlist).await
    }

    async fn create_remote(&self, playlist: &Playlist) -> Result<PlaylistRef, ClientError> {
        let state = self
            .session_state
            .as_deref()
            .ok_or(ClientError::NotConnected)?;
        let uris = playlist
            .tracks
            .iter()
            .filter(|t| !t.uri.is_empty())
            .map(|t| t.uri.clone())
            .collect();

        self.backend
            .create_playlist(state, &playlist.name, DEFAULT_PLAYLIST_DESCRIPTION, uris)
            .await
    }
}
