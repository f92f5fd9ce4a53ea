//! Correlation registry for producer confirm acks.
//!
//! Each accepted send is registered under its correlation ID with a one-shot
//! slot. The ack listener releases the slot when the transport confirms the
//! message; the confirmation waiter blocks on it with a timeout and removes
//! the entry whether or not the ack arrived.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

/// Per-attempt token linking a sent message to its later acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Mint a fresh random correlation ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Single-signal slot: released at most once, observed at most once.
struct AckSlot {
    release: Option<oneshot::Sender<()>>,
    wait: Option<oneshot::Receiver<()>>,
}

/// Concurrent map of pending confirm acks keyed by correlation ID.
///
/// Shared between one orchestrator and its ack listener through an `Arc`.
#[derive(Default)]
pub struct CorrelationRegistry {
    slots: DashMap<CorrelationId, AckSlot>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh slot for `id`.
    pub fn register(&self, id: CorrelationId) {
        let (release, wait) = oneshot::channel();
        let slot = AckSlot {
            release: Some(release),
            wait: Some(wait),
        };
        if self.slots.insert(id.clone(), slot).is_some() {
            warn!(correlation_id = %id, "Replaced existing confirm ack slot");
        }
    }

    /// Release the slot for `id`.
    ///
    /// Returns `false` for unknown, late or duplicate acks. Those are
    /// expected when an ack races a timed-out wait and are only logged.
    pub fn signal(&self, id: &CorrelationId) -> bool {
        let release = self
            .slots
            .get_mut(id)
            .and_then(|mut slot| slot.release.take());

        match release {
            Some(release) => {
                // Receiver may already be gone if the wait just timed out
                drop(release.send(()));
                debug!(correlation_id = %id, "Released confirm ack");
                true
            }
            None => {
                warn!(correlation_id = %id, "Unable to release confirm ack for ID");
                false
            }
        }
    }

    /// Wait up to `timeout` for `id` to be signaled, then remove its entry.
    ///
    /// The entry is removed on every exit path, including when the returned
    /// future is dropped before completion. An ID with no pending wait
    /// returns `false` immediately.
    pub async fn await_and_remove(&self, id: &CorrelationId, timeout: Duration) -> bool {
        let wait = self.slots.get_mut(id).and_then(|mut slot| slot.wait.take());

        let Some(wait) = wait else {
            debug!(correlation_id = %id, "No pending confirm ack to wait for");
            return false;
        };

        let _guard = RemoveOnDrop {
            slots: &self.slots,
            id,
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(Ok(())) => true,
            Ok(Err(_)) => {
                warn!(correlation_id = %id, "Confirm ack slot dropped while waiting");
                false
            }
            Err(_) => {
                debug!(
                    correlation_id = %id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Timed out waiting for confirm ack"
                );
                false
            }
        }
    }

    /// Drop the entry for `id` without waiting.
    pub fn discard(&self, id: &CorrelationId) {
        self.slots.remove(id);
    }

    /// Whether `id` currently has an entry.
    pub fn is_pending(&self, id: &CorrelationId) -> bool {
        self.slots.contains_key(id)
    }

    /// Number of registered entries.
    pub fn pending_count(&self) -> usize {
        self.slots.len()
    }

    /// Drop every pending entry. Waiters in flight observe a closed slot and
    /// return `false`.
    pub fn clear(&self) {
        let dropped = self.slots.len();
        self.slots.clear();
        if dropped > 0 {
            debug!(dropped, "Cleared pending confirm acks");
        }
    }
}

struct RemoveOnDrop<'a> {
    slots: &'a DashMap<CorrelationId, AckSlot>,
    id: &'a CorrelationId,
}

impl Drop for RemoveOnDrop<'_> {
    fn drop(&mut self) {
        self.slots.remove(self.id);
    }
}
