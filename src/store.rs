//! State-keyed token storage.
//!
//! Every completed authorization leaves one [`TokenRecord`] behind, keyed by
//! the opaque OAuth `state` that correlated the redirect with the callback.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Tokens are treated as expired this long before Spotify would reject them.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

const STATE_LEN: usize = 32;

/// Access/refresh token pair obtained from one authorization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds, as reported by the token endpoint.
    pub expires_in: u64,
    pub obtained_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn expires_at(&self) -> DateTime<Utc> {
        let lifetime = i64::try_from(self.expires_in)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        self.obtained_at
            .checked_add_signed(lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at() - Duration::seconds(EXPIRY_MARGIN_SECS)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Key-value storage for token records.
///
/// Keys are opaque and never validated. `put` overwrites, so two callbacks
/// racing on the same state resolve last-write-wins.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn put(&self, state: &str, token: TokenRecord);
    async fn get(&self, state: &str) -> Option<TokenRecord>;
    /// Removes the record; deleting an unknown state is a no-op.
    async fn delete(&self, state: &str);
}

/// Process-local token store. Only suitable for a single-instance deployment.
#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: RwLock<HashMap<String, TokenRecord>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn put(&self, state: &str, token: TokenRecord) {
        self.tokens.write().await.insert(state.to_owned(), token);
    }

    async fn get(&self, state: &str) -> Option<TokenRecord> {
        self.tokens.read().await.get(state).cloned()
    }

    async fn delete(&self, state: &str) {
        self.tokens.write().await.remove(state);
    }
}

/// Generates a fresh, unguessable OAuth state.
pub fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}
