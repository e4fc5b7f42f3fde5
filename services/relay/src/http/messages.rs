use axum::{extract::State, http::HeaderMap, Json};
use relay_protocol::RestMessagesResponse;

use crate::error::RelayError;
use crate::registry::Transport;
use crate::state::AppState;

use super::rest_auth::authenticate;
use super::response::{error_response, HttpResult};

/// `GET /v1/messages` -- dequeues and returns all queued envelopes for the
/// caller, clearing the queue atomically.
pub async fn messages(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> HttpResult<Json<RestMessagesResponse>> {
    let (_public_key, session) = authenticate(&state, &headers)
        .await
        .map_err(error_response)?;

    let Transport::Rest(rest) = &session.transport else {
        return Err(error_response(RelayError::Unauthorized));
    };

    session.touch().await;
    let messages = rest.drain().await;
    Ok(Json(RestMessagesResponse { messages }))
}
