//! Spotify accounts service and Web API client.
//!
//! Uses the Authorization Code flow: the client secret stays on the server and
//! every Web API call is made with a user's access token.

use base64::Engine;
use chrono::Utc;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;

use crate::config::Credentials;
use crate::error::SpotifyError;
use crate::models::{RawTrack, Track};
use crate::mood::Seeds;
use crate::store::TokenRecord;

/// Permissions requested at authorization time.
pub const SCOPES: &[&str] = &[
    "user-read-email",
    "user-read-private",
    "playlist-modify-private",
    "playlist-modify-public",
];

const RECOMMENDATION_LIMIT: u32 = 20;

/// Spotify API client.
#[derive(Clone)]
pub struct SpotifyClient {
    client: Client,
    accounts_url: String,
    api_url: String,
}

impl SpotifyClient {
    pub fn new(accounts_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            accounts_url: accounts_url.into().trim_end_matches('/').to_owned(),
            api_url: api_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Builds the URL the user agent is sent to for consent.
    pub fn authorize_url(&self, client_id: &str, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}/authorize?response_type=code&client_id={}&scope={}&redirect_uri={}&state={}&show_dialog=true",
            self.accounts_url,
            urlencoding::encode(client_id),
            urlencoding::encode(&SCOPES.join(" ")),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state),
        )
    }

    fn token_url(&self) -> String {
        format!("{}/api/token", self.accounts_url)
    }

    fn basic_auth(creds: &Credentials) -> String {
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", creds.client_id, creds.client_secret).as_bytes());
        format!("Basic {}", encoded)
    }

    /// Exchanges an authorization code for a token record.
    pub async fn exchange_code(
        &self,
        creds: &Credentials,
        code: &str,
    ) -> Result<TokenRecord, SpotifyError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", creds.redirect_uri.as_str()),
        ];
        let body = self.post_token_form(creds, &params, "token exchange").await?;
        let refresh_token = body.refresh_token.clone();
        Ok(body.into_record(refresh_token))
    }

    /// Trades a refresh token for a new access token.
    ///
    /// Spotify may omit `refresh_token` in the response; the one passed in is
    /// kept in that case.
    pub async fn refresh(
        &self,
        creds: &Credentials,
        refresh_token: &str,
    ) -> Result<TokenRecord, SpotifyError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let body = self.post_token_form(creds, &params, "token refresh").await?;
        let refresh_token = body
            .refresh_token
            .clone()
            .or_else(|| Some(refresh_token.to_owned()));
        Ok(body.into_record(refresh_token))
    }

    async fn post_token_form(
        &self,
        creds: &Credentials,
        params: &[(&str, &str)],
        endpoint: &'static str,
    ) -> Result<TokenResponse, SpotifyError> {
        let res = self
            .client
            .post(self.token_url())
            .header("Authorization", Self::basic_auth(creds))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .form(params)
            .send()
            .await
            .map_err(|source| SpotifyError::Transport { endpoint, source })?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|source| SpotifyError::Transport { endpoint, source })?;

        // The body is parsed before the status is looked at: an unparseable
        // answer is a failed exchange whatever its status.
        let parsed = serde_json::from_str::<serde_json::Value>(&text).map_err(|e| {
            SpotifyError::Parse {
                endpoint,
                message: format!("{} (status {})", e, status),
            }
        })?;

        if !status.is_success() {
            return Err(SpotifyError::Status {
                endpoint,
                status,
                body: text,
            });
        }

        serde_json::from_value(parsed).map_err(|e| SpotifyError::Parse {
            endpoint,
            message: e.to_string(),
        })
    }

    /// Id of the user owning `token`.
    pub async fn current_user_id(&self, token: &str) -> Result<String, SpotifyError> {
        let url = format!("{}/me", self.api_url);
        let res = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| SpotifyError::Transport {
                endpoint: "profile",
                source,
            })?;

        let profile: Profile = read_json(res, "profile").await?;
        Ok(profile.id)
    }

    /// Fetches recommendations and maps them into the canonical track shape.
    pub async fn recommendations(
        &self,
        token: &str,
        seeds: &Seeds,
        market: &str,
    ) -> Result<Vec<Track>, SpotifyError> {
        let url = format!(
            "{}/recommendations?seed_genres={}&target_valence={:.2}&target_energy={:.2}&market={}&limit={}",
            self.api_url,
            urlencoding::encode(&seeds.genres.join(",")),
            seeds.target_valence,
            seeds.target_energy,
            urlencoding::encode(market),
            RECOMMENDATION_LIMIT,
        );

        let res = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| SpotifyError::Transport {
                endpoint: "recommendations",
                source,
            })?;

        let body: RecommendationsResponse = read_json(res, "recommendations").await?;
        Ok(body
            .tracks
            .into_iter()
            .map(|t| Track::from(t.into_raw()))
            .collect())
    }

    /// Creates an empty private playlist owned by `user_id`.
    pub async fn create_playlist(
        &self,
        token: &str,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<Playlist, SpotifyError> {
        let url = format!(
            "{}/users/{}/playlists",
            self.api_url,
            urlencoding::encode(user_id)
        );

        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({
                "name": name,
                "description": description,
                "public": false,
            }))
            .send()
            .await
            .map_err(|source| SpotifyError::Transport {
                endpoint: "create playlist",
                source,
            })?;

        read_json(res, "create playlist").await
    }

    /// Appends tracks to an existing playlist.
    pub async fn add_tracks(
        &self,
        token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), SpotifyError> {
        let url = format!(
            "{}/playlists/{}/tracks",
            self.api_url,
            urlencoding::encode(playlist_id)
        );

        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "uris": uris }))
            .send()
            .await
            .map_err(|source| SpotifyError::Transport {
                endpoint: "add tracks",
                source,
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(SpotifyError::Status {
                endpoint: "add tracks",
                status,
                body,
            });
        }
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(
    res: Response,
    endpoint: &'static str,
) -> Result<T, SpotifyError> {
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        return Err(SpotifyError::Status {
            endpoint,
            status,
            body,
        });
    }

    res.json().await.map_err(|e| SpotifyError::Parse {
        endpoint,
        message: e.to_string(),
    })
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

impl TokenResponse {
    fn into_record(self, refresh_token: Option<String>) -> TokenRecord {
        TokenRecord {
            access_token: self.access_token,
            refresh_token,
            expires_in: self.expires_in,
            obtained_at: Utc::now(),
        }
    }
}

#[derive(Deserialize)]
struct Profile {
    id: String,
}

#[derive(Deserialize)]
struct RecommendationsResponse {
    #[serde(default)]
    tracks: Vec<SpotifyTrack>,
}

/// A Web API track object (simplified).
#[derive(Clone, Debug, Deserialize)]
pub struct SpotifyTrack {
    pub id: Option<String>,
    pub name: Option<String>,
    pub uri: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Album,
}

impl SpotifyTrack {
    fn into_raw(self) -> RawTrack {
        let artist = self
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        let image = self.album.images.into_iter().find_map(|i| i.url);

        RawTrack {
            id: self.id,
            uri: self.uri,
            name: self.name,
            artist: Some(artist),
            album: self.album.name,
            duration_ms: self.duration_ms,
            durationms: None,
            image,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct Artist {
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct Album {
    pub name: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct Image {
    pub url: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

/// Playlist object returned on creation.
#[derive(Clone, Debug, Deserialize)]
pub struct Playlist {
    pub id: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}
