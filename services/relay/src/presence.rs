//! Presence broadcaster: fans `peer_online`/`peer_offline` events out to
//! every other registered session.
//!
//! Only WS sessions receive a live push -- REST sessions have no standing
//! connection to push onto and instead observe presence via
//! `GET /v1/peers`. Stored-for peers never appear to go offline: consumers
//! relying on presence as liveness must use application-level timeouts
//! instead.

use relay_protocol::{PeerInfo, ServerFrame};

use crate::buffer::SharedBuffer;
use crate::registry::{OutboundFrame, Registry, Transport};

#[derive(Clone)]
pub struct PresenceBroadcaster {
    registry: Registry,
    buffer: SharedBuffer,
}

impl PresenceBroadcaster {
    pub fn new(registry: Registry, buffer: SharedBuffer) -> Self {
        Self { registry, buffer }
    }

    /// Fans `peer_online` out to every other registered session. Ordering
    /// across observers is unspecified; each observer's own frames remain
    /// in the order this function sends them (the WS outbound channel is
    /// per-session FIFO).
    pub async fn broadcast_online(&self, peer: &PeerInfo) {
        self.send_to_others(&peer.public_key, ServerFrame::PeerOnline(peer.clone()))
            .await;
    }

    /// Fans `peer_offline` out, unless `public_key` is a stored-for peer --
    /// those are presented as permanently online.
    pub async fn broadcast_offline(&self, public_key: &str) {
        if self.buffer.is_stored_for(public_key) {
            return;
        }
        self.send_to_others(
            public_key,
            ServerFrame::PeerOffline {
                public_key: public_key.to_owned(),
            },
        )
        .await;
    }

    async fn send_to_others(&self, exclude: &str, frame: ServerFrame) {
        let Ok(text) = serde_json::to_string(&frame) else {
            return;
        };
        for session in self.registry.others(exclude).await {
            if let Transport::Ws(ws) = &session.transport {
                let _ = ws.sender.send(OutboundFrame::Json(text.clone()));
            }
        }
    }
}
