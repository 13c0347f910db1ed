//! Recommendation and playlist endpoints.
//!
//! Each request names the OAuth state it was authorized under. Without a
//! stored token for that state the endpoints answer with mock data.

use axum::{extract::State, Json};

use super::AppState;
use crate::error::AppError;
use crate::models::{
    mock_tracks, CreatePlaylistRequest, LogoutRequest, LogoutResponse, PlaylistRef,
    RecommendationsRequest, RecommendationsResponse, Track, DEFAULT_MARKET, DEFAULT_MOOD,
    DEFAULT_PLAYLIST_DESCRIPTION, DEFAULT_PLAYLIST_NAME, DEFAULT_TIME_OF_DAY,
};
use crate::mood::seeds_for;

/// Access token usable for `state`, refreshing it first when it has expired.
///
/// `None` means the request is served from mock data.
async fn live_token(app: &AppState, state: Option<&str>) -> Result<Option<String>, AppError> {
    if app.config.mock_mode {
        return Ok(None);
    }
    let Some(state) = state.filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let Some(record) = app.tokens.get(state).await else {
        return Ok(None);
    };

    if !record.is_expired() {
        return Ok(Some(record.access_token));
    }

    let (Some(refresh_token), Some(creds)) = (
        record.refresh_token.as_deref(),
        app.config.exchange_credentials(),
    ) else {
        tracing::warn!(%state, "access token expired and cannot be refreshed");
        return Ok(Some(record.access_token));
    };

    let refreshed = app.spotify.refresh(&creds, refresh_token).await?;
    tracing::info!(%state, "refreshed expired access token");
    let access_token = refreshed.access_token.clone();
    app.tokens.put(state, refreshed).await;
    Ok(Some(access_token))
}

/// POST /api/spotify/recommendations
pub async fn recommendations(
    State(app): State<AppState>,
    Json(req): Json<RecommendationsRequest>,
) -> Result<Json<RecommendationsResponse<Track>>, AppError> {
    let Some(token) = live_token(&app, req.state.as_deref()).await? else {
        return Ok(Json(RecommendationsResponse {
            tracks: mock_tracks(),
        }));
    };

    let mood = req.mood.as_deref().unwrap_or(DEFAULT_MOOD);
    let time_of_day = req.time_of_day.as_deref().unwrap_or(DEFAULT_TIME_OF_DAY);
    let market = req.market.as_deref().unwrap_or(DEFAULT_MARKET);

    let tracks = app
        .spotify
        .recommendations(&token, &seeds_for(mood, time_of_day), market)
        .await?;
    tracing::debug!(count = tracks.len(), %mood, %time_of_day, "recommendations fetched");

    Ok(Json(RecommendationsResponse { tracks }))
}

/// POST /api/spotify/create-playlist
///
/// Creation and track attachment are separate upstream calls. A failure
/// adding tracks leaves the (empty) playlist in place and still reports it.
pub async fn create_playlist(
    State(app): State<AppState>,
    Json(req): Json<CreatePlaylistRequest>,
) -> Result<Json<PlaylistRef>, AppError> {
    let Some(token) = live_token(&app, req.state.as_deref()).await? else {
        return Ok(Json(PlaylistRef::mock()));
    };

    let name = req
        .playlist_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_PLAYLIST_NAME);
    let description = req
        .description
        .as_deref()
        .unwrap_or(DEFAULT_PLAYLIST_DESCRIPTION);

    let user_id = app.spotify.current_user_id(&token).await?;
    let playlist = app
        .spotify
        .create_playlist(&token, &user_id, name, description)
        .await?;

    if !req.track_uris.is_empty() {
        if let Err(e) = app
            .spotify
            .add_tracks(&token, &playlist.id, &req.track_uris)
            .await
        {
            tracing::warn!(playlist_id = %playlist.id, "adding tracks failed: {}", e);
        }
    }

    let mut playlist_ref = PlaylistRef::for_id(playlist.id);
    if let Some(url) = playlist.external_urls.spotify {
        playlist_ref.playlist_url = url;
    }
    Ok(Json(playlist_ref))
}

/// POST /api/spotify/logout - Forget the token stored for `state`.
pub async fn logout(
    State(app): State<AppState>,
    Json(req): Json<LogoutRequest>,
) -> Json<LogoutResponse> {
    if let Some(state) = req.state.as_deref().filter(|s| !s.is_empty()) {
        app.tokens.delete(state).await;
        tracing::info!(%state, "spotify token cleared");
    }
    Json(LogoutResponse { ok: true })
}
