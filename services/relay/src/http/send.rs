use axum::{extract::State, http::HeaderMap, Json};
use relay_protocol::{RestSendRequest, RestSendResponse};

use crate::codec;
use crate::error::RelayError;
use crate::registry::Transport;
use crate::state::AppState;

use super::rest_auth::authenticate;
use super::response::{bad_request, error_response, HttpResult};

/// `POST /v1/send` -- the server constructs and signs the envelope using
/// the session's own stored private key, then routes it exactly as a WS
/// `message` control frame would be.
pub async fn send(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RestSendRequest>,
) -> HttpResult<Json<RestSendResponse>> {
    let (public_key, session) = authenticate(&state, &headers)
        .await
        .map_err(error_response)?;

    if body.to.is_empty() || body.envelope_type.is_empty() {
        return Err(bad_request("to and type are required"));
    }

    let Transport::Rest(rest) = &session.transport else {
        return Err(error_response(RelayError::Unauthorized));
    };

    let envelope = codec::create(
        &body.envelope_type,
        &public_key,
        &rest.private_key_hex,
        body.payload,
        None,
        body.in_reply_to,
    )
    .map_err(error_response)?;
    let message_id = envelope.id.clone();

    session.touch().await;
    state
        .router
        .route(&public_key, &body.to, envelope)
        .await
        .map_err(error_response)?;

    Ok(Json(RestSendResponse {
        ok: true,
        message_id,
    }))
}
