//! Authorization redirect and OAuth callback.

use axum::{
    extract::{Query, State},
    response::Response,
};
use serde::Deserialize;

use super::{found, AppState};
use crate::error::{AppError, SpotifyError};
use crate::store::generate_state;

const CONNECT_ROUTE: &str = "/#/spotify-connect";

#[derive(Debug, Deserialize)]
pub struct LoginParams {
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// GET /login - Send the user agent to Spotify's consent page.
pub async fn login(
    State(app): State<AppState>,
    Query(params): Query<LoginParams>,
) -> Result<Response, AppError> {
    let (client_id, redirect_uri) = app.config.authorize_credentials().ok_or_else(|| {
        AppError::Configuration(
            "Server not configured: missing SPOTIFY_REDIRECT_URI or SPOTIFY_CLIENT_ID".into(),
        )
    })?;

    let state = params
        .state
        .filter(|s| !s.is_empty())
        .unwrap_or_else(generate_state);

    let url = app.spotify.authorize_url(client_id, redirect_uri, &state);
    tracing::debug!(authorize_url = %url, "redirecting to Spotify");
    Ok(found(&url))
}

/// Terminal outcome of one callback, reported to the front end via the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The user or Spotify refused; carries Spotify's error code.
    Denied(String),
    NoCode,
    ExchangeFailed,
    /// The token endpoint could not be reached.
    ServerError,
    Connected,
}

impl CallbackOutcome {
    fn query(&self, state: &str) -> String {
        let state = urlencoding::encode(state);
        match self {
            CallbackOutcome::Denied(error) => {
                format!("error={}&state={}", urlencoding::encode(error), state)
            }
            CallbackOutcome::NoCode => format!("error=no_code&state={}", state),
            CallbackOutcome::ExchangeFailed => {
                format!("error=token_exchange_failed&state={}", state)
            }
            CallbackOutcome::ServerError => format!("error=server_error&state={}", state),
            CallbackOutcome::Connected => format!("hasTokens=true&state={}", state),
        }
    }
}

/// GET /callback - Exchange the authorization code and hand control back to the front end.
///
/// Every outcome except a misconfigured server is a redirect: the browser is
/// mid-navigation and nothing is waiting on a response body.
pub async fn callback(
    State(app): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AppError> {
    tracing::debug!(
        has_code = params.code.is_some(),
        state = ?params.state,
        error = ?params.error,
        "callback received"
    );

    let (outcome, state) = exchange(&app, params).await?;
    match &outcome {
        CallbackOutcome::Connected => tracing::info!(%state, "spotify account connected"),
        other => tracing::warn!(%state, outcome = ?other, "spotify connect did not complete"),
    }

    let url = format!(
        "{}{}?{}",
        app.config.frontend_base(),
        CONNECT_ROUTE,
        outcome.query(&state)
    );
    Ok(found(&url))
}

async fn exchange(
    app: &AppState,
    params: CallbackParams,
) -> Result<(CallbackOutcome, String), AppError> {
    let state = params.state.unwrap_or_default();

    if let Some(error) = params.error.filter(|e| !e.is_empty()) {
        return Ok((CallbackOutcome::Denied(error), state));
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return Ok((CallbackOutcome::NoCode, state));
    };

    let creds = app.config.exchange_credentials().ok_or_else(|| {
        AppError::Configuration(
            "Server not configured: missing SPOTIFY_CLIENT_ID, SPOTIFY_CLIENT_SECRET or SPOTIFY_REDIRECT_URI"
                .into(),
        )
    })?;

    let token = match app.spotify.exchange_code(&creds, &code).await {
        Ok(token) => token,
        Err(err @ SpotifyError::Transport { .. }) => {
            tracing::error!("token exchange failed: {}", err);
            return Ok((CallbackOutcome::ServerError, state));
        }
        Err(err) => {
            tracing::error!("token exchange failed: {}", err);
            return Ok((CallbackOutcome::ExchangeFailed, state));
        }
    };

    let state = if state.is_empty() {
        generate_state()
    } else {
        state
    };
    app.tokens.put(&state, token).await;
    Ok((CallbackOutcome::Connected, state))
}
