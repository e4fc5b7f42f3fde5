use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, Json};
use relay_protocol::{RestRegisterRequest, RestRegisterResponse};
use tokio::sync::Mutex;
use zeroize::Zeroizing;

use crate::auth::generate_token;
use crate::codec::now_millis;
use crate::identity::keys_match;
use crate::registry::{OutboundFrame, RestTransport, Session, Transport};
use crate::state::AppState;

use super::response::{bad_request, HttpResult};

/// `POST /v1/register` -- the REST counterpart of the WS `register`
/// control frame. Verifies the key pair by signing and verifying a fixed
/// probe string, issues a bearer token, and installs a `RestTransport`
/// session in the same registry the WS FSM uses.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RestRegisterRequest>,
) -> HttpResult<Json<RestRegisterResponse>> {
    if body.public_key.is_empty() || body.private_key.is_empty() {
        return Err(bad_request("publicKey and privateKey are required"));
    }
    if !keys_match(&body.public_key, &body.private_key) {
        return Err(bad_request("publicKey and privateKey do not form a matching pair"));
    }

    let token = generate_token();
    let expires_at = now_millis() + state.config.rest_token_ttl.as_millis() as u64;

    let rest_transport = Arc::new(RestTransport {
        token: token.clone(),
        expires_at,
        private_key_hex: Zeroizing::new(body.private_key),
        capacity: state.config.rest_queue_capacity,
        queue: Mutex::new(VecDeque::new()),
    });
    let session = Arc::new(Session {
        public_key: body.public_key.clone(),
        name: body.name,
        metadata: body.metadata,
        last_seen: Mutex::new(Instant::now()),
        transport: Transport::Rest(rest_transport),
    });

    if let Some(evicted) = state.register_session(session.clone()).await {
        if let Transport::Ws(ws) = &evicted.transport {
            let _ = ws.sender.send(OutboundFrame::Close);
        }
        state.presence.broadcast_offline(&body.public_key).await;
    }
    state.issue_token(&body.public_key, token.clone()).await;

    if state.buffer.is_stored_for(&body.public_key) {
        if let Transport::Rest(rest) = &session.transport {
            rest.fill(state.buffer.drain(&body.public_key).await).await;
        }
    }

    state.presence.broadcast_online(&session.peer_info()).await;

    let peers = state
        .peer_list_including_stored(Some(&body.public_key))
        .await;

    Ok(Json(RestRegisterResponse {
        token,
        expires_at,
        peers: Some(peers),
    }))
}
