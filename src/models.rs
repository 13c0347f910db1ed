//! Wire shapes shared by the backend proxy and the client library.

use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_TRACK: &str = "Unknown Track";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

pub const DEFAULT_MOOD: &str = "neutral";
pub const DEFAULT_TIME_OF_DAY: &str = "afternoon";
pub const DEFAULT_MARKET: &str = "US";
pub const DEFAULT_PLAYLIST_NAME: &str = "SoundtrackGen Playlist";
pub const DEFAULT_PLAYLIST_DESCRIPTION: &str = "Generated by SoundtrackGen";

const PLAYLIST_URL_BASE: &str = "https://open.spotify.com/playlist";

/// Canonical track shape handed to the front end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub uri: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub duration_ms: u64,
    pub image: String,
    /// Human readable `M:SS`.
    pub duration: String,
}

/// A track as it arrives over the wire, every field optional.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawTrack {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Legacy spelling some payloads still carry.
    #[serde(default)]
    pub durationms: Option<u64>,
    #[serde(default)]
    pub image: Option<String>,
}

impl From<RawTrack> for Track {
    fn from(raw: RawTrack) -> Self {
        let duration_ms = raw.duration_ms.or(raw.durationms).unwrap_or(0);
        Track {
            id: raw.id.unwrap_or_default(),
            uri: raw.uri.unwrap_or_default(),
            name: non_empty_or(raw.name, UNKNOWN_TRACK),
            artist: non_empty_or(raw.artist, UNKNOWN_ARTIST),
            album: non_empty_or(raw.album, UNKNOWN_ALBUM),
            duration_ms,
            image: raw.image.unwrap_or_default(),
            duration: format_duration(duration_ms),
        }
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_owned())
}

/// Formats milliseconds as `M:SS`, rounding to the nearest second.
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms / 1000 + u64::from(ms % 1000 >= 500);
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Fixed recommendation set served when no live token is available.
pub fn mock_tracks() -> Vec<Track> {
    vec![
        Track::from(RawTrack {
            id: Some("mock1".into()),
            uri: Some("spotify:track:mock1".into()),
            name: Some("City Lights".into()),
            artist: Some("Analog Dreams".into()),
            album: Some("Neon Nights".into()),
            duration_ms: Some(222_000),
            ..RawTrack::default()
        }),
        Track::from(RawTrack {
            id: Some("mock2".into()),
            uri: Some("spotify:track:mock2".into()),
            name: Some("Morning Glow".into()),
            artist: Some("Golden Hour".into()),
            album: Some("Sunrise Stories".into()),
            duration_ms: Some(245_000),
            ..RawTrack::default()
        }),
    ]
}

/// Reference to a playlist created (or mocked) on the user's account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistRef {
    pub playlist_id: String,
    pub playlist_url: String,
}

impl PlaylistRef {
    pub fn for_id(id: impl Into<String>) -> Self {
        let playlist_id = id.into();
        let playlist_url = format!("{}/{}", PLAYLIST_URL_BASE, playlist_id);
        Self {
            playlist_id,
            playlist_url,
        }
    }

    pub fn mock() -> Self {
        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        Self::for_id(format!("pl_{}", suffix))
    }
}

/// Body of `POST /api/spotify/recommendations`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsRequest {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub time_of_day: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecommendationsResponse<T> {
    pub tracks: Vec<T>,
}

/// Body of `POST /api/spotify/create-playlist`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistRequest {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub playlist_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub track_uris: Vec<String>,
}

/// Body of `POST /api/spotify/logout`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(222_000), "3:42");
        assert_eq!(format_duration(245_000), "4:05");
        assert_eq!(format_duration(59_600), "1:00");
        assert_eq!(format_duration(3_599_000), "59:59");
    }

    #[test]
    fn huge_duration_does_not_overflow() {
        let raw: RawTrack =
            serde_json::from_str(r#"{"id":"x","duration_ms":18446744073709551615}"#).unwrap();
        let track = Track::from(raw);
        assert_eq!(track.duration_ms, u64::MAX);
        // 18446744073709552 seconds, rounded up from the trailing 615 ms.
        assert_eq!(track.duration, "307445734561825:52");
    }

    #[test]
    fn missing_fields_get_defaults() {
        let track = Track::from(RawTrack::default());
        assert_eq!(track.name, UNKNOWN_TRACK);
        assert_eq!(track.artist, UNKNOWN_ARTIST);
        assert_eq!(track.album, UNKNOWN_ALBUM);
        assert_eq!(track.image, "");
        assert_eq!(track.duration_ms, 0);
        assert_eq!(track.duration, "0:00");
    }

    #[test]
    fn legacy_duration_field_is_accepted() {
        let raw: RawTrack =
            serde_json::from_str(r#"{"id":"x","name":"Song","durationms":61000}"#).unwrap();
        let track = Track::from(raw);
        assert_eq!(track.duration_ms, 61_000);
        assert_eq!(track.duration, "1:01");
    }

    #[test]
    fn mock_playlist_ids() {
        let playlist = PlaylistRef::mock();
        assert!(playlist.playlist_id.starts_with("pl_"));
        assert_eq!(playlist.playlist_id.len(), 11);
        assert!(playlist
            .playlist_id
            .chars()
            .skip(3)
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_eq!(
            playlist.playlist_url,
            format!("https://open.spotify.com/playlist/{}", playlist.playlist_id)
        );
    }

    #[test]
    fn create_playlist_request_uses_camel_case() {
        let req: CreatePlaylistRequest = serde_json::from_str(
            r#"{"state":"s","playlistName":"Rainy","trackUris":["spotify:track:1"]}"#,
        )
        .unwrap();
        assert_eq!(req.playlist_name.as_deref(), Some("Rainy"));
        assert_eq!(req.track_uris, vec!["spotify:track:1".to_string()]);
        assert!(req.description.is_none());
    }
}
