//! Confirmation waiter: one ack round over the accepted sends.

use crate::cancel::CancelSignal;
use crate::correlation::{CorrelationId, CorrelationRegistry};
use crate::update::MetricUpdate;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Waits for confirm acks of every accepted send.
pub struct ConfirmationWaiter {
    registry: Arc<CorrelationRegistry>,
    ack_timeout: Duration,
}

impl ConfirmationWaiter {
    pub fn new(registry: Arc<CorrelationRegistry>, ack_timeout: Duration) -> Self {
        Self {
            registry,
            ack_timeout,
        }
    }

    /// Wait for all acks concurrently and return the unconfirmed updates.
    ///
    /// Waits run in parallel so a round costs about one ack timeout. A fired
    /// cancel signal ends the remaining waits early; those updates count as
    /// unconfirmed.
    pub async fn await_confirm_acks(
        &self,
        sent: Vec<(CorrelationId, MetricUpdate)>,
        cancel: &CancelSignal,
    ) -> Vec<MetricUpdate> {
        let waits = sent.into_iter().map(|(correlation_id, update)| {
            let mut cancel = cancel.clone();
            async move {
                // Poll the wait first so its slot is claimed and reclaimed even
                // when cancellation has already fired
                let confirmed = tokio::select! {
                    biased;
                    confirmed = self.registry.await_and_remove(&correlation_id, self.ack_timeout) => confirmed,
                    _ = cancel.cancelled() => {
                        warn!(correlation_id = %correlation_id, "Interrupted waiting for confirm ack");
                        false
                    }
                };
                (correlation_id, update, confirmed)
            }
        });

        join_all(waits)
            .await
            .into_iter()
            .filter_map(|(correlation_id, update, confirmed)| {
                if confirmed {
                    None
                } else {
                    debug!(correlation_id = %correlation_id, "Confirm ack not received");
                    Some(update)
                }
            })
            .collect()
    }
}
