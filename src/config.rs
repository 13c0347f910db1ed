use std::env;

pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:5500";

/// Application configuration from environment variables.
///
/// Spotify credentials are optional at startup: a server without them still
/// boots and answers `/login` and `/callback` with an explicit configuration
/// error instead of crashing.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub spotify_redirect_uri: Option<String>,
    pub frontend_url: String,
    pub accounts_url: String,
    pub api_url: String,
    /// Serve mock recommendations and playlists even when a token is stored.
    pub mock_mode: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = match env::var("PORT") {
            Ok(p) => p
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid port number, got {:?}", p))?,
            Err(_) => 3000,
        };

        let config = Self {
            port,
            spotify_client_id: non_empty_var("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: non_empty_var("SPOTIFY_CLIENT_SECRET"),
            spotify_redirect_uri: non_empty_var("SPOTIFY_REDIRECT_URI"),
            frontend_url: non_empty_var("FRONTEND_URL")
                .unwrap_or_else(|| DEFAULT_FRONTEND_URL.into()),
            accounts_url: non_empty_var("SPOTIFY_ACCOUNTS_URL")
                .unwrap_or_else(|| DEFAULT_ACCOUNTS_URL.into()),
            api_url: non_empty_var("SPOTIFY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()),
            mock_mode: env::var("SPOTIFY_MOCK_MODE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        };

        if config.spotify_client_id.is_none() || config.spotify_client_secret.is_none() {
            tracing::warn!(
                "SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET are not set; OAuth will not work until they are provided"
            );
        }

        Ok(config)
    }

    /// Credentials needed to start the authorization redirect.
    pub fn authorize_credentials(&self) -> Option<(&str, &str)> {
        Some((
            self.spotify_client_id.as_deref()?,
            self.spotify_redirect_uri.as_deref()?,
        ))
    }

    /// Everything the code exchange needs: client id, secret and redirect URI.
    pub fn exchange_credentials(&self) -> Option<Credentials> {
        Some(Credentials {
            client_id: self.spotify_client_id.clone()?,
            client_secret: self.spotify_client_secret.clone()?,
            redirect_uri: self.spotify_redirect_uri.clone()?,
        })
    }

    /// Base of the front-end URL the callback redirects back to, without a trailing slash.
    pub fn frontend_base(&self) -> &str {
        self.frontend_url.trim_end_matches('/')
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            spotify_client_id: None,
            spotify_client_secret: None,
            spotify_redirect_uri: None,
            frontend_url: DEFAULT_FRONTEND_URL.into(),
            accounts_url: DEFAULT_ACCOUNTS_URL.into(),
            api_url: DEFAULT_API_URL.into(),
            mock_mode: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
