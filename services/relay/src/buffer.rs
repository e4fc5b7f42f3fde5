//! Store-and-forward buffer: a per-public-key bounded FIFO for the
//! configured stored-for allowlist.
//!
//! A slot exists only for keys named in `stored_for` at construction time --
//! the buffer never grows new keys at runtime.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use relay_protocol::Envelope;
use tokio::sync::RwLock;

pub struct StoredForBuffer {
    capacity: usize,
    /// Fixed at construction; used for cheap synchronous membership checks
    /// (presence fan-out, peer_list snapshots) without touching the lock.
    stored_for: HashSet<String>,
    queues: RwLock<HashMap<String, VecDeque<Envelope>>>,
}

impl StoredForBuffer {
    pub fn new(stored_for: &[String], capacity: usize) -> Self {
        let queues = stored_for
            .iter()
            .map(|pk| (pk.clone(), VecDeque::new()))
            .collect();
        Self {
            capacity,
            stored_for: stored_for.iter().cloned().collect(),
            queues: RwLock::new(queues),
        }
    }

    pub fn is_stored_for(&self, public_key: &str) -> bool {
        self.stored_for.contains(public_key)
    }

    pub fn stored_for_keys(&self) -> impl Iterator<Item = &str> {
        self.stored_for.iter().map(String::as_str)
    }

    /// Appends `envelope` to `public_key`'s buffer, dropping the oldest
    /// entry if the bound is exceeded. No-op if `public_key` is not a
    /// configured stored-for peer.
    pub async fn push(&self, public_key: &str, envelope: Envelope) {
        let mut queues = self.queues.write().await;
        if let Some(queue) = queues.get_mut(public_key) {
            if queue.len() >= self.capacity {
                queue.pop_front();
            }
            queue.push_back(envelope);
        }
    }

    /// Drains all buffered envelopes for `public_key` in FIFO order,
    /// leaving the buffer for that key empty. Returns an empty vec if the
    /// key is not stored-for or has nothing buffered.
    pub async fn drain(&self, public_key: &str) -> Vec<Envelope> {
        let mut queues = self.queues.write().await;
        match queues.get_mut(public_key) {
            Some(queue) => queue.drain(..).collect(),
            None => Vec::new(),
        }
    }
}

pub type SharedBuffer = Arc<StoredForBuffer>;

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(text: &str) -> Envelope {
        Envelope {
            id: format!("id-{text}"),
            envelope_type: "publish".to_owned(),
            sender: "pkT".to_owned(),
            timestamp: 0,
            payload: serde_json::json!({"text": text}),
            in_reply_to: None,
            signature: "sig".to_owned(),
        }
    }

    #[tokio::test]
    async fn push_and_drain_preserves_fifo_order_and_empties_buffer() {
        let buffer = StoredForBuffer::new(&["pkS".to_owned()], 10);
        buffer.push("pkS", envelope("first")).await;
        buffer.push("pkS", envelope("second")).await;

        let drained = buffer.drain("pkS").await;
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].payload["text"], "first");
        assert_eq!(drained[1].payload["text"], "second");

        assert!(buffer.drain("pkS").await.is_empty());
    }

    #[tokio::test]
    async fn push_to_non_stored_key_is_a_no_op() {
        let buffer = StoredForBuffer::new(&["pkS".to_owned()], 10);
        buffer.push("pkOther", envelope("x")).await;
        assert!(buffer.drain("pkOther").await.is_empty());
    }

    #[tokio::test]
    async fn overflow_drops_oldest_entry() {
        let buffer = StoredForBuffer::new(&["pkS".to_owned()], 2);
        buffer.push("pkS", envelope("a")).await;
        buffer.push("pkS", envelope("b")).await;
        buffer.push("pkS", envelope("c")).await;

        let drained = buffer.drain("pkS").await;
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].payload["text"], "b");
        assert_eq!(drained[1].payload["text"], "c");
    }
}
