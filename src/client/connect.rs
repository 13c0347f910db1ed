use std::collections::HashMap;

use super::{BackendClient, ClientError, Navigator, Storage, CONNECTED_KEY, STATE_KEY};
use crate::store::generate_state;

/// Where the connect flow stands from the client's point of view.
///
/// A failed return never downgrades an existing connection: while
/// `is_connected()` is true the phase stays `Connected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectPhase {
    Idle,
    /// The page has been sent to the authorization redirector.
    Connecting,
    Connected,
    /// The callback reported an error.
    Denied(String),
    /// The callback came back without tokens.
    Incomplete,
}

/// True when `url` carries a query string the callback may have produced.
pub fn has_auth_response(url: &str) -> bool {
    url.split_once('?').is_some_and(|(_, q)| !q.is_empty())
}

/// Front-end Spotify service: connect flow plus playlist generation.
pub struct SpotifyService<S, N> {
    pub(super) storage: S,
    pub(super) navigator: N,
    pub(super) backend: BackendClient,
    pub(super) connected: bool,
    pub(super) session_state: Option<String>,
    phase: ConnectPhase,
}

impl<S: Storage, N: Navigator> SpotifyService<S, N> {
    /// Restores the connection flag and cached state from `storage`.
    pub fn new(storage: S, navigator: N, backend: BackendClient) -> Self {
        let connected = storage.get(CONNECTED_KEY).as_deref() == Some("true");
        let session_state = storage.get(STATE_KEY).filter(|s| !s.is_empty());
        let phase = if connected {
            ConnectPhase::Connected
        } else {
            ConnectPhase::Idle
        };
        Self {
            storage,
            navigator,
            backend,
            connected,
            session_state,
            phase,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn session_state(&self) -> Option<&str> {
        self.session_state.as_deref()
    }

    pub fn phase(&self) -> &ConnectPhase {
        &self.phase
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Returns the cached state, generating and persisting one on first use.
    pub fn ensure_state(&mut self) -> String {
        if let Some(state) = &self.session_state {
            return state.clone();
        }
        let state = generate_state();
        self.storage.set(STATE_KEY, &state);
        self.session_state = Some(state.clone());
        state
    }

    /// Sends the whole page to the backend's authorization redirector.
    pub fn connect(&mut self) {
        let state = self.ensure_state();
        let url = self.backend.login_url(&state);
        tracing::info!("starting Spotify OAuth flow");
        self.phase = ConnectPhase::Connecting;
        self.navigator.assign(&url);
    }

    /// Consumes the query string the callback redirected back with.
    ///
    /// `Ok(true)` once tokens are confirmed, `Ok(false)` when the URL carries
    /// no completed authorization, `Err(Denied)` when the callback reported an
    /// error. Only the query string is inspected, never the path.
    pub fn handle_auth_redirect(&mut self, location: &str) -> Result<bool, ClientError> {
        let Some((visible, query)) = location.split_once('?') else {
            return Ok(false);
        };
        if query.is_empty() {
            return Ok(false);
        }

        let params: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();

        if let Some(error) = params.get("error").filter(|e| !e.is_empty()) {
            tracing::warn!(%error, "spotify connect was denied");
            if !self.connected {
                self.phase = ConnectPhase::Denied(error.clone());
            }
            return Err(ClientError::Denied(error.clone()));
        }

        if params.get("hasTokens").map(String::as_str) != Some("true") {
            if !self.connected {
                self.phase = ConnectPhase::Incomplete;
            }
            return Ok(false);
        }

        let state = match params.get("state").filter(|s| !s.is_empty()) {
            Some(state) => state.clone(),
            None => self.ensure_state(),
        };
        self.storage.set(STATE_KEY, &state);
        self.storage.set(CONNECTED_KEY, "true");
        self.session_state = Some(state);
        self.connected = true;
        self.phase = ConnectPhase::Connected;

        self.navigator.replace(visible);
        Ok(true)
    }

    /// Forgets the connection locally and tells the backend, best effort.
    ///
    /// The local flag is cleared whatever happens to the logout request.
    pub async fn disconnect(&mut self) {
        let state = self.session_state.take();
        self.storage.remove(CONNECTED_KEY);
        self.storage.remove(STATE_KEY);
        self.connected = false;
        self.phase = ConnectPhase::Idle;

        if let Some(state) = state {
            if let Err(e) = self.backend.logout(&state).await {
                tracing::debug!("logout notification failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
pub(super) mod tests {
    use super::super::MemoryStorage;
    use super::*;

    /// Records navigation instead of performing it.
    #[derive(Debug, Default)]
    pub struct RecordingNavigator {
        pub current: String,
        pub assigned: Vec<String>,
    }

    impl Navigator for RecordingNavigator {
        fn assign(&mut self, url: &str) {
            self.assigned.push(url.to_owned());
            self.current = url.to_owned();
        }

        fn replace(&mut self, url: &str) {
            self.current = url.to_owned();
        }
    }

    fn service(storage: MemoryStorage) -> SpotifyService<MemoryStorage, RecordingNavigator> {
        SpotifyService::new(
            storage,
            RecordingNavigator::default(),
            BackendClient::new("http://backend.test/"),
        )
    }

    #[test]
    fn connect_reuses_cached_state() {
        let mut spotify = service(MemoryStorage::new());
        spotify.connect();
        let state = spotify.session_state().unwrap().to_owned();

        assert_eq!(spotify.phase(), &ConnectPhase::Connecting);
        assert_eq!(
            spotify.navigator().assigned,
            vec![format!("http://backend.test/login?state={}", state)]
        );
        assert_eq!(spotify.storage().get(STATE_KEY), Some(state.clone()));

        spotify.connect();
        assert_eq!(spotify.navigator().assigned[1], spotify.navigator().assigned[0]);
    }

    #[test]
    fn successful_redirect_persists_and_strips_query() {
        let mut spotify = service(MemoryStorage::new());
        let url = "http://localhost:5500/#/spotify-connect?hasTokens=true&state=abc123";

        assert!(spotify.handle_auth_redirect(url).unwrap());
        assert!(spotify.is_connected());
        assert_eq!(spotify.session_state(), Some("abc123"));
        assert_eq!(spotify.storage().get(STATE_KEY).as_deref(), Some("abc123"));
        assert_eq!(spotify.storage().get(CONNECTED_KEY).as_deref(), Some("true"));
        assert_eq!(
            spotify.navigator().current,
            "http://localhost:5500/#/spotify-connect"
        );
        assert!(!spotify.navigator().current.contains('?'));
    }

    #[test]
    fn denied_redirect_leaves_flag_alone() {
        let mut spotify = service(MemoryStorage::new());
        let url = "http://localhost:5500/#/spotify-connect?error=access_denied&state=abc123";

        let err = spotify.handle_auth_redirect(url).unwrap_err();
        assert!(matches!(&err, ClientError::Denied(e) if e == "access_denied"));
        assert_eq!(err.to_string(), "access_denied");
        assert!(!spotify.is_connected());
        assert_eq!(spotify.storage().get(CONNECTED_KEY), None);
        assert_eq!(spotify.phase(), &ConnectPhase::Denied("access_denied".into()));
    }

    #[test]
    fn denied_redirect_keeps_existing_connection() {
        let mut storage = MemoryStorage::new();
        storage.set(STATE_KEY, "abc");
        storage.set(CONNECTED_KEY, "true");
        let mut spotify = service(storage);

        let err = spotify
            .handle_auth_redirect("http://localhost:5500/#/spotify-connect?error=access_denied")
            .unwrap_err();
        assert!(matches!(err, ClientError::Denied(_)));
        assert!(spotify.is_connected());
        assert_eq!(spotify.session_state(), Some("abc"));
        assert_eq!(spotify.storage().get(CONNECTED_KEY).as_deref(), Some("true"));
        assert_eq!(spotify.phase(), &ConnectPhase::Connected);
    }

    #[test]
    fn missing_has_tokens_is_incomplete() {
        let mut spotify = service(MemoryStorage::new());
        assert!(!spotify
            .handle_auth_redirect("http://localhost:5500/#/spotify-connect?state=abc")
            .unwrap());
        assert!(!spotify.is_connected());
        assert_eq!(spotify.phase(), &ConnectPhase::Incomplete);
        assert_eq!(spotify.storage().get(STATE_KEY), None);
    }

    #[test]
    fn url_without_query_is_ignored() {
        let mut spotify = service(MemoryStorage::new());
        assert!(!spotify
            .handle_auth_redirect("http://localhost:5500/#/spotify-connect")
            .unwrap());
        assert_eq!(spotify.phase(), &ConnectPhase::Idle);
        assert!(!has_auth_response("http://localhost:5500/#/dashboard"));
        assert!(has_auth_response("http://localhost:5500/#/spotify-connect?error=x"));
    }

    #[test]
    fn has_tokens_without_state_uses_cached_state() {
        let mut storage = MemoryStorage::new();
        storage.set(STATE_KEY, "cached");
        let mut spotify = service(storage);

        assert!(spotify
            .handle_auth_redirect("http://localhost:5500/#/spotify-connect?hasTokens=true")
            .unwrap());
        assert_eq!(spotify.session_state(), Some("cached"));
    }

    #[test]
    fn restores_connection_from_storage() {
        let mut storage = MemoryStorage::new();
        storage.set(STATE_KEY, "abc");
        storage.set(CONNECTED_KEY, "true");
        let spotify = service(storage);

        assert!(spotify.is_connected());
        assert_eq!(spotify.session_state(), Some("abc"));
        assert_eq!(spotify.phase(), &ConnectPhase::Connected);
    }

    #[tokio::test]
    async fn disconnect_is_local_even_when_backend_is_unreachable() {
        let mut storage = MemoryStorage::new();
        storage.set(STATE_KEY, "abc");
        storage.set(CONNECTED_KEY, "true");
        let mut spotify = SpotifyService::new(
            storage,
            RecordingNavigator::default(),
            // Nothing listens on port 9 (discard).
            BackendClient::new("http://127.0.0.1:9"),
        );

        spotify.disconnect().await;

        assert!(!spotify.is_connected());
        assert_eq!(spotify.session_state(), None);
        assert_eq!(spotify.storage().get(STATE_KEY), None);
        assert_eq!(spotify.storage().get(CONNECTED_KEY), None);
        assert_eq!(spotify.phase(), &ConnectPhase::Idle);
    }
}
