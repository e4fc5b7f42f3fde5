//! Shared application state: the registry, router, presence broadcaster,
//! store-and-forward buffer, and the REST token index, threaded through
//! every handler via `axum::State`.

use std::collections::HashMap;
use std::sync::Arc;

use relay_protocol::PeerInfo;
use tokio::sync::RwLock;

use crate::buffer::{SharedBuffer, StoredForBuffer};
use crate::config::RelayConfig;
use crate::presence::PresenceBroadcaster;
use crate::registry::{Registry, Session};
use crate::router::Router;

/// token -> publicKey, so a bearer token resolves straight to the owning
/// session without scanning the registry.
type TokenIndex = Arc<RwLock<HashMap<String, String>>>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub registry: Registry,
    pub buffer: SharedBuffer,
    pub router: Router,
    pub presence: PresenceBroadcaster,
    pub tokens: TokenIndex,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        let registry = Registry::new();
        let buffer: SharedBuffer = Arc::new(StoredForBuffer::new(
            &config.stored_for,
            config.stored_buffer_capacity,
        ));
        let router = Router::new(registry.clone(), buffer.clone());
        let presence = PresenceBroadcaster::new(registry.clone(), buffer.clone());
        Self {
            config: Arc::new(config),
            registry,
            buffer,
            router,
            presence,
            tokens: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Snapshot of registered peers plus any stored-for key that is
    /// currently offline -- `peer_list` always includes stored-for keys
    /// even when disconnected.
    pub async fn peer_list_including_stored(&self, exclude: Option<&str>) -> Vec<PeerInfo> {
        let mut peers = self.registry.peer_list(exclude).await;
        let known: std::collections::HashSet<&str> =
            peers.iter().map(|p| p.public_key.as_str()).collect();
        for stored_key in self.buffer.stored_for_keys() {
            if exclude == Some(stored_key) || known.contains(stored_key) {
                continue;
            }
            peers.push(PeerInfo {
                public_key: stored_key.to_owned(),
                name: None,
            });
        }
        peers
    }

    /// Issues a fresh token for `public_key`, revoking any prior token for
    /// the same key -- re-registration revokes the previous token.
    pub async fn issue_token(&self, public_key: &str, token: String) {
        let mut tokens = self.tokens.write().await;
        tokens.retain(|_, pk| pk != public_key);
        tokens.insert(token, public_key.to_owned());
    }

    pub async fn resolve_token(&self, token: &str) -> Option<String> {
        self.tokens.read().await.get(token).cloned()
    }

    pub async fn revoke_token_for(&self, public_key: &str) {
        self.tokens.write().await.retain(|_, pk| pk != public_key);
    }

    /// Registers `session`, evicting any prior session for the same public
    /// key. Returns the evicted session (if any) so the caller can close
    /// its socket and fan out `peer_offline` before the new registration's
    /// `peer_online`.
    pub async fn register_session(&self, session: Arc<Session>) -> Option<Arc<Session>> {
        self.registry.register(session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn peer_list_including_stored_surfaces_offline_stored_for_keys() {
        let mut config = RelayConfig::default();
        config.stored_for = vec!["pkS".to_owned()];
        let state = AppState::new(config);

        let peers = state.peer_list_including_stored(None).await;
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].public_key, "pkS");
    }

    #[tokio::test]
    async fn issuing_a_new_token_revokes_the_prior_one_for_the_same_key() {
        let state = AppState::new(RelayConfig::default());
        state.issue_token("pkA", "token1".to_owned()).await;
        assert_eq!(state.resolve_token("token1").await.as_deref(), Some("pkA"));

        state.issue_token("pkA", "token2".to_owned()).await;
        assert_eq!(state.resolve_token("token1").await, None);
        assert_eq!(state.resolve_token("token2").await.as_deref(), Some("pkA"));
    }
}
