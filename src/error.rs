use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failures talking to Spotify's accounts service or Web API.
#[derive(Debug, thiserror::Error)]
pub enum SpotifyError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{endpoint} response could not be parsed: {message}")]
    Parse {
        endpoint: &'static str,
        message: String,
    },
}

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing credentials or redirect URI. Answered in plain text.
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Spotify(#[from] SpotifyError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Configuration(msg) => {
                tracing::error!("configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response()
            }
            AppError::Spotify(err) => {
                tracing::warn!("upstream failure: {}", err);
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": err.to_string() })),
                )
                    .into_response()
            }
        }
    }
}
