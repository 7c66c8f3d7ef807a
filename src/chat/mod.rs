//! In-memory registry of live chat subscribers.
//!
//! Maps a conversation id to the set of open WebSocket handles subscribed to
//! it. A handle is the sending half of an unbounded channel into one socket
//! task; one person with three tabs open holds three handles. The registry
//! is constructed once per process and carried in `AppState`, never reached
//! through a global.
//!
//! The mutex guards only map mutation. Broadcast snapshots the senders under
//! the lock and delivers after releasing it, so no lock is ever held across
//! a socket send.

use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Sending half of a subscriber's channel. Payloads are pre-serialized JSON.
pub type SubscriberTx = mpsc::UnboundedSender<String>;

#[derive(Default)]
pub struct ConnectionRegistry {
    subscribers: Mutex<HashMap<String, HashMap<Uuid, SubscriberTx>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle under a conversation. Returns the handle id used to
    /// leave later.
    pub fn join(&self, conversation_id: &str, tx: SubscriberTx) -> Uuid {
        let handle_id = Uuid::new_v4();
        let mut subscribers = self.subscribers.lock();
        subscribers
            .entry(conversation_id.to_string())
            .or_default()
            .insert(handle_id, tx);
        handle_id
    }

    /// Remove a handle. The conversation entry is dropped entirely once its
    /// last handle leaves, so dead conversations do not accumulate.
    pub fn leave(&self, conversation_id: &str, handle_id: Uuid) {
        let mut subscribers = self.subscribers.lock();
        if let Some(handles) = subscribers.get_mut(conversation_id) {
            handles.remove(&handle_id);
            if handles.is_empty() {
                subscribers.remove(conversation_id);
            }
        }
    }

    /// Deliver a payload to every live handle for a conversation, in
    /// arbitrary order. A handle whose receiving task is gone is pruned and
    /// does not prevent delivery to the rest. Returns the delivered count.
    pub fn broadcast(&self, conversation_id: &str, payload: &str) -> usize {
        let targets: Vec<(Uuid, SubscriberTx)> = {
            let subscribers = self.subscribers.lock();
            match subscribers.get(conversation_id) {
                Some(handles) => handles.iter().map(|(id, tx)| (*id, tx.clone())).collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for (handle_id, tx) in targets {
            if tx.send(payload.to_string()).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(
                    conversation_id = %conversation_id,
                    handle_id = %handle_id,
                    "Dropping dead chat subscriber"
                );
                self.leave(conversation_id, handle_id);
            }
        }

        metrics::counter!(crate::api::metrics::CHAT_MESSAGES_FANNED_OUT_TOTAL)
            .increment(delivered as u64);
        delivered
    }

    /// Number of live handles for a conversation.
    pub fn subscriber_count(&self, conversation_id: &str) -> usize {
        self.subscribers
            .lock()
            .get(conversation_id)
            .map(|handles| handles.len())
            .unwrap_or(0)
    }

    /// Whether the conversation has an entry at all (distinct from having
    /// zero subscribers: an empty entry is a leak and must not exist).
    pub fn has_conversation(&self, conversation_id: &str) -> bool {
        self.subscribers.lock().contains_key(conversation_id)
    }
}
