use axum::{extract::State, http::HeaderMap, Json};
use relay_protocol::RestPeersResponse;

use crate::state::AppState;

use super::rest_auth::authenticate;
use super::response::{error_response, HttpResult};

/// `GET /v1/peers` -- the merged WS + REST peer list, excluding the caller.
pub async fn peers(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> HttpResult<Json<RestPeersResponse>> {
    let (public_key, _session) = authenticate(&state, &headers)
        .await
        .map_err(error_response)?;

    let peers = state.peer_list_including_stored(Some(&public_key)).await;
    Ok(Json(RestPeersResponse { peers }))
}
