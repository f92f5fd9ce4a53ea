//! Batch sender: one send round over the working set.

use crate::correlation::{CorrelationId, CorrelationRegistry};
use crate::transport::MetricTransport;
use crate::update::MetricUpdate;
use std::sync::Arc;
use tracing::debug;

/// Result of a single send round.
#[derive(Debug, Default)]
pub struct SendRound {
    /// Accepted updates awaiting a confirm ack, keyed by correlation ID.
    /// Empty when confirm acks are disabled.
    pub sent: Vec<(CorrelationId, MetricUpdate)>,
    /// Updates the transport rejected this round.
    pub failed: Vec<MetricUpdate>,
    /// Number of updates the transport accepted.
    pub accepted: usize,
}

impl SendRound {
    /// Whether every update in the round was accepted.
    pub fn all_accepted(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Hands each update to the transport under a fresh correlation ID.
pub struct BatchSender {
    transport: Arc<dyn MetricTransport>,
    registry: Arc<CorrelationRegistry>,
    confirm_ack_enabled: bool,
}

impl BatchSender {
    pub fn new(
        transport: Arc<dyn MetricTransport>,
        registry: Arc<CorrelationRegistry>,
        confirm_ack_enabled: bool,
    ) -> Self {
        Self {
            transport,
            registry,
            confirm_ack_enabled,
        }
    }

    /// Attempt every update exactly once.
    ///
    /// Rejections never abort the round. With confirm acks enabled the slot
    /// is registered before the send so an ack that beats the return of
    /// `send` is still matched; a rejected send discards it again.
    pub fn send_all(&self, updates: Vec<MetricUpdate>) -> SendRound {
        let mut round = SendRound {
            sent: Vec::with_capacity(updates.len()),
            failed: Vec::new(),
            accepted: 0,
        };

        for update in updates {
            let correlation_id = CorrelationId::generate();

            if self.confirm_ack_enabled {
                self.registry.register(correlation_id.clone());
            }

            if self.transport.send(&correlation_id, &update) {
                round.accepted += 1;
                if self.confirm_ack_enabled {
                    round.sent.push((correlation_id, update));
                }
            } else {
                debug!(correlation_id = %correlation_id, "Send rejected by transport");
                if self.confirm_ack_enabled {
                    self.registry.discard(&correlation_id);
                }
                round.failed.push(update);
            }
        }

        round
    }
}
