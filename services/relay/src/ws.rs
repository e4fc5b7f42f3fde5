//! WS session FSM: Unregistered -> Registered -> Closed.
//!
//! One task per live socket (§5), `tokio::select!`-driven over socket
//! reads, a heartbeat interval, and an out-of-band command channel -- here
//! the "command channel" is the session's own outbound queue, serializing
//! every write whether it originates from a router delivery, a presence
//! fan-out, or a buffer drain.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use relay_protocol::{ClientFrame, EnvelopeDelivery, ServerFrame};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, info_span, warn, Instrument};

use crate::error::RelayError;
use crate::registry::{OutboundFrame, Session, Transport, WsTransport};
use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send_json(socket: &mut WebSocket, value: &impl serde::Serialize) -> bool {
    match serde_json::to_string(value) {
        Ok(text) => socket.send(Message::Text(text.into())).await.is_ok(),
        Err(_) => false,
    }
}

async fn send_error(socket: &mut WebSocket, message: &str) -> bool {
    send_json(
        socket,
        &ServerFrame::Error {
            message: message.to_owned(),
        },
    )
    .await
}

/// Unregistered phase: the only accepted frame is `register`; any other
/// frame yields `{type:"error", message:"Not registered"}` with no state
/// change. Returns `None` if the socket closed or idled out before a
/// successful registration.
async fn await_registration(
    socket: &mut WebSocket,
    idle_timeout: std::time::Duration,
) -> Option<ClientFrame> {
    loop {
        let frame = match tokio::time::timeout(idle_timeout, socket.recv()).await {
            Ok(Some(Ok(Message::Text(text)))) => text,
            Ok(Some(Ok(Message::Ping(data)))) => {
                let _ = socket.send(Message::Pong(data)).await;
                continue;
            }
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) => return None,
            Ok(Some(Ok(_))) => continue,
            Ok(Some(Err(_))) => return None,
            Err(_) => return None,
        };

        match serde_json::from_str::<ClientFrame>(&frame) {
            Ok(register @ ClientFrame::Register { .. }) => return Some(register),
            _ => {
                if !send_error(socket, &RelayError::NotRegistered.ws_message()).await {
                    return None;
                }
            }
        }
    }
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let Some(ClientFrame::Register {
        public_key,
        name,
        metadata,
    }) = await_registration(&mut socket, state.config.idle_timeout).await
    else {
        return;
    };

    let span = info_span!("ws_session", public_key = %public_key);
    async move {
        run_registered_session(socket, state, public_key, name, metadata).await;
    }
    .instrument(span)
    .await;
}

async fn run_registered_session(
    mut socket: WebSocket,
    state: AppState,
    public_key: String,
    name: Option<String>,
    metadata: Option<serde_json::Value>,
) {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundFrame>();
    let session = Arc::new(Session {
        public_key: public_key.clone(),
        name,
        metadata,
        last_seen: Mutex::new(Instant::now()),
        transport: Transport::Ws(WsTransport {
            sender: outbound_tx,
        }),
    });

    // Install the session, evicting whatever was there first (single-owner
    // registry).
    if let Some(evicted) = state.register_session(session.clone()).await {
        if let Transport::Ws(ws) = &evicted.transport {
            let _ = ws.sender.send(OutboundFrame::Close);
        }
        state.presence.broadcast_offline(&public_key).await;
    }
    info!("registered");

    if !send_json(
        &mut socket,
        &ServerFrame::Registered {
            public_key: public_key.clone(),
        },
    )
    .await
    {
        close_session(&state, &session).await;
        return;
    }

    let peers = state.peer_list_including_stored(Some(&public_key)).await;
    if !send_json(&mut socket, &ServerFrame::PeerList { peers }).await {
        close_session(&state, &session).await;
        return;
    }

    state.presence.broadcast_online(&session.peer_info()).await;

    // Buffer drain precedes any live traffic (§4.6): a single
    // non-interruptible phase before the select loop below starts reading
    // the outbound channel.
    if state.buffer.is_stored_for(&public_key) {
        for envelope in state.buffer.drain(&public_key).await {
            let delivery = EnvelopeDelivery {
                envelope,
                from_name: None,
            };
            if !send_json(&mut socket, &delivery).await {
                close_session(&state, &session).await;
                return;
            }
        }
    }

    let mut heartbeat = tokio::time::interval(state.config.heartbeat_interval);
    heartbeat.tick().await; // first tick fires immediately

    loop {
        tokio::select! {
            received = tokio::time::timeout(state.config.idle_timeout, socket.recv()) => {
                match received {
                    Ok(Some(Ok(Message::Text(text)))) => {
                        session.touch().await;
                        if !handle_registered_frame(&mut socket, &state, &session, &text).await {
                            break;
                        }
                    }
                    Ok(Some(Ok(Message::Ping(data)))) => {
                        session.touch().await;
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Some(Ok(Message::Pong(_)))) => {
                        session.touch().await;
                    }
                    Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {
                        info!("socket closed by peer");
                        break;
                    }
                    Ok(Some(Err(e))) => {
                        warn!(error = %e, "WS error");
                        break;
                    }
                    Ok(Some(Ok(_))) => {}
                    Err(_) => {
                        warn!("idle timeout");
                        break;
                    }
                }
            }
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(OutboundFrame::Json(text)) => {
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(OutboundFrame::Close) | None => break,
                }
            }
            _ = heartbeat.tick() => {
                if !send_json(&mut socket, &ServerFrame::Ping).await {
                    break;
                }
            }
        }
    }

    close_session(&state, &session).await;
    info!("session closed");
}

/// Handles one text frame in the Registered state. Returns `false` if the
/// socket write failed and the session should close.
///
/// A frame that doesn't parse as one of the four control kinds is a
/// protocol-defined extension (peer-list queries, referrals, ...)
/// forwarded to the discovery layer elsewhere; it doesn't alter routing
/// semantics here, so it's logged and ignored rather than answered with
/// an error frame.
async fn handle_registered_frame(
    socket: &mut WebSocket,
    state: &AppState,
    session: &Arc<Session>,
    text: &str,
) -> bool {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(_) => {
            warn!("unexpected message kind");
            return true;
        }
    };

    match frame {
        ClientFrame::Register { .. } => {
            // A second register on the same socket re-registers the same
            // connection; simplest correct behavior is to treat it like the
            // registry does for any other socket: reinstall and refresh
            // peer_list delivery is unnecessary since it's the same peer.
            true
        }
        ClientFrame::Message { to, envelope } => {
            match state.router.route(&session.public_key, &to, envelope).await {
                Ok(()) => true,
                Err(err) => send_error(socket, &err.ws_message()).await,
            }
        }
        ClientFrame::Ping => {
            session.touch().await;
            send_json(socket, &ServerFrame::Pong).await
        }
        ClientFrame::Pong => {
            session.touch().await;
            true
        }
    }
}

/// Removes `session` from the registry and fans out `peer_offline`, but
/// only if it is still the currently-installed session for its public key
/// -- an evicted session's own task reaching this point (after its
/// eviction already ran this same path) must not clobber the session that
/// replaced it.
async fn close_session(state: &AppState, session: &Arc<Session>) {
    let still_current = state
        .registry
        .get(&session.public_key)
        .await
        .is_some_and(|current| Arc::ptr_eq(&current, session));
    if !still_current {
        return;
    }
    state.registry.remove(&session.public_key).await;
    state.presence.broadcast_offline(&session.public_key).await;
}
