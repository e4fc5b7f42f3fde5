use axum::{extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse};

use crate::state::AppState;

use super::rest_auth::authenticate;
use super::response::error_response;

/// `DELETE /v1/disconnect` -- revokes the session: removes the registry
/// entry and the bearer token, then fans out `peer_offline` unless the
/// caller is a stored-for peer.
pub async fn disconnect(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> axum::response::Response {
    let (public_key, _session) = match authenticate(&state, &headers).await {
        Ok(pair) => pair,
        Err(err) => return error_response(err),
    };

    state.registry.remove(&public_key).await;
    state.revoke_token_for(&public_key).await;
    state.presence.broadcast_offline(&public_key).await;

    StatusCode::NO_CONTENT.into_response()
}
