//! Session registry: maps public key -> live session (WS or REST),
//! enforcing the at-most-one-session-per-public-key invariant.
//!
//! A session's transport is kept behind a small closed `Transport` enum so
//! the router can dispatch to a WS socket or a REST inbound queue
//! identically.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use relay_protocol::{Envelope, PeerInfo};
use serde_json::Value;
use tokio::sync::{mpsc, Mutex, RwLock};
use zeroize::Zeroizing;

/// Outcome of attempting to hand an envelope to a session's transport.
#[derive(Debug, PartialEq, Eq)]
pub enum DeliverOutcome {
    Ok,
    QueueFull,
    /// The transport has gone away (e.g. the WS outbound channel is
    /// closed); callers should treat this like "not connected".
    Closed,
}

/// A frame queued for delivery on a WS session's outbound channel. Kept as
/// an enum (not a bare `String`) so eviction can ask the session task to
/// close the socket without a second side channel.
#[derive(Debug, Clone)]
pub enum OutboundFrame {
    Json(String),
    Close,
}

/// The live transport half of a WS session: a channel the session's socket
/// task drains to serialize all outbound writes (§5: "serialized per
/// session").
#[derive(Clone)]
pub struct WsTransport {
    pub sender: mpsc::UnboundedSender<OutboundFrame>,
}

impl WsTransport {
    fn deliver_json(&self, text: String) -> DeliverOutcome {
        match self.sender.send(OutboundFrame::Json(text)) {
            Ok(()) => DeliverOutcome::Ok,
            Err(_) => DeliverOutcome::Closed,
        }
    }
}

/// The REST counterpart: a bounded inbound queue plus the session's private
/// key (used by the server to sign on the client's behalf). The private key
/// is held in a `Zeroizing<String>` so it is overwritten the moment the
/// session is dropped.
pub struct RestTransport {
    pub token: String,
    pub expires_at: u64,
    pub private_key_hex: Zeroizing<String>,
    pub capacity: usize,
    pub queue: Mutex<std::collections::VecDeque<Envelope>>,
}

impl RestTransport {
    async fn deliver(&self, envelope: Envelope) -> DeliverOutcome {
        let mut queue = self.queue.lock().await;
        if queue.len() >= self.capacity {
            return DeliverOutcome::QueueFull;
        }
        queue.push_back(envelope);
        DeliverOutcome::Ok
    }

    /// Dequeues and returns all queued envelopes, clearing the queue
    /// atomically (`GET /v1/messages`).
    pub async fn drain(&self) -> Vec<Envelope> {
        self.queue.lock().await.drain(..).collect()
    }

    /// Appends a store-and-forward drain unconditionally, bypassing the
    /// capacity check -- catch-up delivery on register must not lose
    /// messages the buffer already accepted.
    pub async fn fill(&self, envelopes: Vec<Envelope>) {
        self.queue.lock().await.extend(envelopes);
    }
}

pub enum Transport {
    Ws(WsTransport),
    Rest(Arc<RestTransport>),
}

pub struct Session {
    pub public_key: String,
    pub name: Option<String>,
    pub metadata: Option<Value>,
    pub last_seen: Mutex<Instant>,
    pub transport: Transport,
}

impl Session {
    pub fn peer_info(&self) -> PeerInfo {
        PeerInfo {
            public_key: self.public_key.clone(),
            name: self.name.clone(),
        }
    }

    pub async fn touch(&self) {
        *self.last_seen.lock().await = Instant::now();
    }

    /// Hands `envelope` to the session's transport, attaching `from_name`
    /// as the router's out-of-band sibling field for WS deliveries (REST
    /// responses carry the envelope bare -- `fromName` has no home in the
    /// REST polling contract since `sender` already names the origin).
    pub async fn deliver(&self, envelope: Envelope, from_name: Option<String>) -> DeliverOutcome {
        match &self.transport {
            Transport::Ws(ws) => {
                let delivery = relay_protocol::EnvelopeDelivery {
                    envelope,
                    from_name,
                };
                match serde_json::to_string(&delivery) {
                    Ok(text) => ws.deliver_json(text),
                    Err(_) => DeliverOutcome::Closed,
                }
            }
            Transport::Rest(rest) => rest.deliver(envelope).await,
        }
    }

    pub fn is_ws(&self) -> bool {
        matches!(self.transport, Transport::Ws(_))
    }
}

/// Map of public key -> live session. Single writer at a time; readers
/// (presence fan-out, router lookups) proceed concurrently with each other.
#[derive(Clone)]
pub struct Registry {
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Installs `session`, evicting and returning any prior session for the
    /// same public key (the caller closes its socket and fires the
    /// offline fan-out, per the WS FSM's eviction path).
    pub async fn register(&self, session: Arc<Session>) -> Option<Arc<Session>> {
        self.sessions
            .write()
            .await
            .insert(session.public_key.clone(), session)
    }

    pub async fn remove(&self, public_key: &str) -> Option<Arc<Session>> {
        self.sessions.write().await.remove(public_key)
    }

    pub async fn get(&self, public_key: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(public_key).cloned()
    }

    pub async fn contains(&self, public_key: &str) -> bool {
        self.sessions.read().await.contains_key(public_key)
    }

    /// Snapshot of every registered peer's `PeerInfo`, optionally excluding
    /// one public key (used for `peer_list`/`GET /v1/peers`, both of which
    /// exclude the caller).
    pub async fn peer_list(&self, exclude: Option<&str>) -> Vec<PeerInfo> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| exclude != Some(s.public_key.as_str()))
            .map(|s| s.peer_info())
            .collect()
    }

    /// All sessions except the one named, for fan-out.
    pub async fn others(&self, exclude: &str) -> Vec<Arc<Session>> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.public_key != exclude)
            .cloned()
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
