//! Fake Spotify accounts service and Web API, served in-process.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::json;

use soundtrackgen::config::Config;
use soundtrackgen::handlers::AppState;
use soundtrackgen::store::InMemoryTokenStore;

pub const FRONTEND: &str = "http://localhost:5500";

#[derive(Clone, Default)]
pub struct Upstream {
    pub token_calls: Arc<AtomicUsize>,
    pub refresh_calls: Arc<AtomicUsize>,
    pub add_track_calls: Arc<AtomicUsize>,
    pub fail_add_tracks: Arc<AtomicBool>,
    pub fail_refresh: Arc<AtomicBool>,
    pub last_basic_auth: Arc<Mutex<Option<String>>>,
    pub last_bearer: Arc<Mutex<Option<String>>>,
}

impl Upstream {
    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn add_track_calls(&self) -> usize {
        self.add_track_calls.load(Ordering::SeqCst)
    }

    fn record_bearer(&self, headers: &HeaderMap) {
        *self.last_bearer.lock().unwrap() = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
    }
}

async fn token(
    State(up): State<Upstream>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    *up.last_basic_auth.lock().unwrap() = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    if form.get("grant_type").map(String::as_str) == Some("refresh_token") {
        up.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if up.fail_refresh.load(Ordering::SeqCst) {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_grant" })),
            )
                .into_response();
        }
        return Json(json!({ "access_token": "refreshed", "expires_in": 3600 })).into_response();
    }

    up.token_calls.fetch_add(1, Ordering::SeqCst);
    match form.get("code").map(String::as_str) {
        Some("bad") => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response(),
        Some("garbled") => (StatusCode::OK, "<html>oops</html>").into_response(),
        _ => Json(json!({
            "access_token": "access-1",
            "token_type": "Bearer",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "scope": "user-read-email",
        }))
        .into_response(),
    }
}

async fn me(State(up): State<Upstream>, headers: HeaderMap) -> Json<serde_json::Value> {
    up.record_bearer(&headers);
    Json(json!({ "id": "user-1", "display_name": "Test User" }))
}

async fn recommendations(
    State(up): State<Upstream>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    up.record_bearer(&headers);
    if params.get("market").map(String::as_str) == Some("XX") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }

    Json(json!({
        "tracks": [
            {
                "id": "t1",
                "uri": "spotify:track:t1",
                "name": "Real Song",
                "duration_ms": 222000,
                "artists": [{ "name": "Band A" }, { "name": "Band B" }],
                "album": { "name": "Real Album", "images": [{ "url": "https://img/1" }] }
            },
            {
                "id": "t2",
                "uri": "spotify:track:t2"
            }
        ]
    }))
    .into_response()
}

async fn create_playlist(
    State(up): State<Upstream>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    up.record_bearer(&headers);
    if user_id != "user-1" || body["public"] != json!(false) {
        return StatusCode::BAD_REQUEST.into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "id": "pl123",
            "name": body["name"],
            "external_urls": { "spotify": "https://open.spotify.com/playlist/pl123" }
        })),
    )
        .into_response()
}

async fn add_tracks(State(up): State<Upstream>, Path(_id): Path<String>) -> StatusCode {
    up.add_track_calls.fetch_add(1, Ordering::SeqCst);
    if up.fail_add_tracks.load(Ordering::SeqCst) {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::CREATED
    }
}

pub fn upstream_router(up: Upstream) -> Router {
    Router::new()
        .route("/authorize", get(|| async { "consent page" }))
        .route("/api/token", post(token))
        .route("/v1/me", get(me))
        .route("/v1/recommendations", get(recommendations))
        .route("/v1/users/:user_id/playlists", post(create_playlist))
        .route("/v1/playlists/:id/tracks", post(add_tracks))
        .with_state(up)
}

/// Fake Open-Meteo forecast and BigDataCloud reverse-geocoding services.
pub fn context_router() -> Router {
    Router::new()
        .route(
            "/forecast",
            get(|| async {
                Json(json!({
                    "current_weather": { "temperature": 17.6, "weathercode": 61 }
                }))
            }),
        )
        .route(
            "/reverse-geocode-client",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                if params.get("localityLanguage").map(String::as_str) != Some("en") {
                    return StatusCode::BAD_REQUEST.into_response();
                }
                Json(json!({
                    "city": "Lisbon",
                    "principalSubdivision": "Lisbon District",
                    "countryName": "Portugal",
                    "countryCode": "PT"
                }))
                .into_response()
            }),
        )
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

pub async fn spawn_upstream() -> (Upstream, String) {
    let up = Upstream::default();
    let base = spawn(upstream_router(up.clone())).await;
    (up, base)
}

pub fn configured(upstream_base: &str) -> Config {
    Config {
        spotify_client_id: Some("client-id".into()),
        spotify_client_secret: Some("client-secret".into()),
        spotify_redirect_uri: Some("http://localhost:3000/callback".into()),
        frontend_url: FRONTEND.into(),
        accounts_url: upstream_base.into(),
        api_url: format!("{}/v1", upstream_base),
        ..Config::default()
    }
}

pub fn app_state(config: Config) -> (AppState, Arc<InMemoryTokenStore>) {
    let store = Arc::new(InMemoryTokenStore::new());
    (AppState::new(config, store.clone()), store)
}
