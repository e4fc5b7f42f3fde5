//! Router: `route(from, to, envelope)` -- the one place provenance,
//! integrity, and target dispatch all meet.

use relay_protocol::Envelope;

use crate::buffer::SharedBuffer;
use crate::codec;
use crate::error::RelayError;
use crate::registry::{DeliverOutcome, Registry};

#[derive(Clone)]
pub struct Router {
    registry: Registry,
    buffer: SharedBuffer,
}

impl Router {
    pub fn new(registry: Registry, buffer: SharedBuffer) -> Self {
        Self { registry, buffer }
    }

    /// Routes `envelope` from `from_pub` to `to_pub`: verifies provenance
    /// and integrity, then dispatches to a live session or the
    /// store-and-forward buffer.
    pub async fn route(
        &self,
        from_pub: &str,
        to_pub: &str,
        envelope: Envelope,
    ) -> Result<(), RelayError> {
        if envelope.sender != from_pub {
            return Err(RelayError::SenderMismatch);
        }
        if let Err(reason) = codec::verify(&envelope) {
            return Err(RelayError::InvalidEnvelope(reason));
        }

        if let Some(session) = self.registry.get(to_pub).await {
            let from_name = self
                .registry
                .get(from_pub)
                .await
                .and_then(|s| s.name.clone());
            return match session.deliver(envelope, from_name).await {
                DeliverOutcome::Ok => Ok(()),
                DeliverOutcome::QueueFull => Err(RelayError::QueueFull),
                // The WS socket went away between lookup and delivery;
                // from the sender's perspective this reads the same as
                // "not connected" -- no separate wire-visible state exists
                // for a half-dead session.
                DeliverOutcome::Closed => Err(RelayError::RecipientNotConnected),
            };
        }

        if self.buffer.is_stored_for(to_pub) {
            self.buffer.push(to_pub, envelope).await;
            return Ok(());
        }

        Err(RelayError::RecipientNotConnected)
    }
}
