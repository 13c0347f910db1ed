use reqwest::Client;
use serde::Deserialize;

use super::ClientError;
use crate::models::{
    CreatePlaylistRequest, LogoutRequest, PlaylistRef, RawTrack, RecommendationsRequest, Track,
};

/// HTTP client for the SoundtrackGen backend.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

/// The backend answers `{tracks: [...]}`; older deployments sent a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum TracksPayload {
    Bare(Vec<RawTrack>),
    Wrapped {
        #[serde(default)]
        tracks: Vec<RawTrack>,
    },
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// URL of the authorization redirector for `state`.
    pub fn login_url(&self, state: &str) -> String {
        format!("{}/login?state={}", self.base_url, urlencoding::encode(state))
    }

    pub async fn recommendations(
        &self,
        state: Option<&str>,
        mood: &str,
        time_of_day: &str,
        market: &str,
    ) -> Result<Vec<Track>, ClientError> {
        let body = RecommendationsRequest {
            state: state.map(str::to_owned),
            mood: Some(mood.to_owned()),
            time_of_day: Some(time_of_day.to_owned()),
            market: Some(market.to_owned()),
        };

        let res = self
            .client
            .post(format!("{}/api/spotify/recommendations", self.base_url))
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(ClientError::Status {
                endpoint: "recommendations",
                status: res.status(),
            });
        }

        let tracks = match res.json::<TracksPayload>().await? {
            TracksPayload::Bare(tracks) | TracksPayload::Wrapped { tracks } => tracks,
        };
        Ok(tracks.into_iter().map(Track::from).collect())
    }

    pub async fn create_playlist(
        &self,
        state: &str,
        name: &str,
        description: &str,
        track_uris: Vec<String>,
    ) -> Result<PlaylistRef, ClientError> {
        let body = CreatePlaylistRequest {
            state: Some(state.to_owned()),
            playlist_name: Some(name.to_owned()),
            description: Some(description.to_owned()),
            track_uris,
        };

        let res = self
            .client
            .post(format!("{}/api/spotify/create-playlist", self.base_url))
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(ClientError::Status {
                endpoint: "create playlist",
                status: res.status(),
            });
        }
        Ok(res.json().await?)
    }

    pub async fn logout(&self, state: &str) -> Result<(), ClientError> {
        let res = self
            .client
            .post(format!("{}/api/spotify/logout", self.base_url))
            .json(&LogoutRequest {
                state: Some(state.to_owned()),
            })
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(ClientError::Status {
                endpoint: "logout",
                status: res.status(),
            });
        }
        Ok(())
    }
}
