//! Shared bearer-token authentication for the REST session layer.

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::auth::extract_bearer;
use crate::codec::now_millis;
use crate::error::RelayError;
use crate::registry::{Session, Transport};
use crate::state::AppState;

/// Resolves the bearer token in `headers` to its owning public key and
/// live session, rejecting missing/unknown/expired tokens uniformly as
/// `Unauthorized`. Reaps the session on expiry so a stale REST
/// registration doesn't linger in the registry.
pub async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(String, Arc<Session>), RelayError> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer)
        .ok_or(RelayError::Unauthorized)?;

    let public_key = state
        .resolve_token(token)
        .await
        .ok_or(RelayError::Unauthorized)?;

    let session = state
        .registry
        .get(&public_key)
        .await
        .ok_or(RelayError::Unauthorized)?;

    match &session.transport {
        Transport::Rest(rest) => {
            if now_millis() > rest.expires_at {
                state.registry.remove(&public_key).await;
                state.revoke_token_for(&public_key).await;
                return Err(RelayError::Unauthorized);
            }
            Ok((public_key, session))
        }
        Transport::Ws(_) => Err(RelayError::Unauthorized),
    }
}
