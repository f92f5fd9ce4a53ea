//! Retry orchestrator: drives send and ack rounds until the batch is
//! delivered or the retry budget is spent.
//!
//! ```text
//! SENDING -> WAITING_ACK -> EVALUATING -> DONE_SUCCESS
//!    ^                          |     \-> DONE_FAILURE
//!    |                          v
//!    +-------------------- RETRYING (backoff)
//! ```

use crate::cancel::CancelSignal;
use crate::correlation::CorrelationRegistry;
use crate::error::{DeliveryError, DeliveryResult};
use crate::sender::BatchSender;
use crate::transport::MetricTransport;
use crate::update::MetricUpdate;
use crate::waiter::ConfirmationWaiter;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Bounds on the retry loop. Whichever bound is hit first ends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of send rounds.
    pub max_attempts: u32,
    /// Wall-clock budget for the whole loop.
    pub fail_timeout: Duration,
    /// Fixed pause between rounds.
    pub backoff_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            fail_timeout: Duration::from_secs(5 * 60),
            backoff_interval: Duration::from_secs(5),
        }
    }
}

/// Delivery configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryConfig {
    /// Wait for producer confirm acks before counting an item delivered.
    pub confirm_ack_enabled: bool,
    /// How long to wait for each confirm ack.
    pub confirm_ack_timeout: Duration,
    /// Retry budget.
    pub retry: RetryPolicy,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            confirm_ack_enabled: true,
            confirm_ack_timeout: Duration::from_millis(500),
            retry: RetryPolicy::default(),
        }
    }
}

impl DeliveryConfig {
    pub fn validate(&self) -> DeliveryResult<()> {
        if self.confirm_ack_enabled && self.confirm_ack_timeout.is_zero() {
            return Err(DeliveryError::InvalidConfig(
                "confirm ack timeout must be positive when confirm acks are enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Orchestration states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Sending,
    WaitingAck,
    Evaluating,
    Retrying,
    DoneSuccess,
    DoneFailure,
}

impl DeliveryState {
    /// Transition out of `Evaluating`.
    pub fn evaluate(
        round_succeeded: bool,
        elapsed: Duration,
        attempts: u32,
        retry: &RetryPolicy,
    ) -> Self {
        if round_succeeded {
            DeliveryState::DoneSuccess
        } else if elapsed >= retry.fail_timeout || attempts >= retry.max_attempts {
            DeliveryState::DoneFailure
        } else {
            DeliveryState::Retrying
        }
    }
}

/// Terminal result of one orchestration.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub success: bool,
    /// Send rounds performed.
    pub attempts: u32,
    pub elapsed: Duration,
    /// Working set left when the loop stopped. Empty on success.
    pub outstanding: Vec<MetricUpdate>,
    /// Whether an explicit cancel stopped the loop.
    pub cancelled: bool,
}

/// Drives repeated send and ack rounds over the shrinking working set.
pub struct RetryOrchestrator {
    config: DeliveryConfig,
    registry: Arc<CorrelationRegistry>,
    sender: BatchSender,
    waiter: ConfirmationWaiter,
}

impl RetryOrchestrator {
    /// Orchestrator over `transport`. Fails if `config` does not validate.
    pub fn new(
        config: DeliveryConfig,
        transport: Arc<dyn MetricTransport>,
        registry: Arc<CorrelationRegistry>,
    ) -> DeliveryResult<Self> {
        config.validate()?;
        Ok(Self {
            sender: BatchSender::new(transport, registry.clone(), config.confirm_ack_enabled),
            waiter: ConfirmationWaiter::new(registry.clone(), config.confirm_ack_timeout),
            registry,
            config,
        })
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    /// Registry shared with the ack listener.
    pub fn registry(&self) -> &Arc<CorrelationRegistry> {
        &self.registry
    }

    /// Deliver `updates` with no external cancellation.
    pub async fn deliver(&self, updates: Vec<MetricUpdate>) -> DeliveryResult<DeliveryOutcome> {
        self.deliver_with_cancel(updates, CancelSignal::never()).await
    }

    /// Deliver `updates`, stopping early if `cancel` fires.
    ///
    /// Budget exhaustion is reported through the outcome, not as an error.
    /// Only an empty batch is rejected up front. A signal that has already
    /// fired returns a cancelled outcome without sending anything.
    pub async fn deliver_with_cancel(
        &self,
        updates: Vec<MetricUpdate>,
        mut cancel: CancelSignal,
    ) -> DeliveryResult<DeliveryOutcome> {
        if updates.is_empty() {
            return Err(DeliveryError::EmptyBatch);
        }

        let retry = self.config.retry;
        let started = Instant::now();

        if cancel.is_cancelled() {
            warn!(items = updates.len(), "Bulk update cancelled before first attempt");
            return Ok(DeliveryOutcome {
                success: false,
                attempts: 0,
                elapsed: started.elapsed(),
                outstanding: updates,
                cancelled: true,
            });
        }

        let mut working = updates;
        let mut attempts: u32 = 0;
        let mut cancelled = false;

        let state = loop {
            attempts += 1;
            debug!(
                attempt = attempts,
                max_attempts = retry.max_attempts,
                items = working.len(),
                "Bulk update attempt"
            );

            trace!(state = ?DeliveryState::Sending);
            let round = self.sender.send_all(std::mem::take(&mut working));

            trace!(state = ?DeliveryState::WaitingAck, accepted = round.accepted);
            let failed_confirm = if self.config.confirm_ack_enabled {
                self.waiter.await_confirm_acks(round.sent, &cancel).await
            } else {
                Vec::new()
            };

            trace!(state = ?DeliveryState::Evaluating);
            let round_succeeded = round.failed.is_empty() && failed_confirm.is_empty();
            if !round_succeeded {
                debug!(
                    attempt = attempts,
                    failed_send = round.failed.len(),
                    failed_confirm = failed_confirm.len(),
                    "Bulk update round incomplete"
                );
            }
            working = round.failed;
            working.extend(failed_confirm);

            let next = DeliveryState::evaluate(round_succeeded, started.elapsed(), attempts, &retry);
            if next != DeliveryState::Retrying {
                break next;
            }
            if cancel.is_cancelled() {
                cancelled = true;
                break DeliveryState::DoneFailure;
            }

            trace!(state = ?DeliveryState::Retrying);
            let woke_on_timer = tokio::select! {
                _ = tokio::time::sleep(retry.backoff_interval) => true,
                _ = cancel.cancelled() => false,
            };
            if !woke_on_timer {
                cancelled = true;
                break DeliveryState::DoneFailure;
            }
        };

        let elapsed = started.elapsed();
        let success = state == DeliveryState::DoneSuccess;
        if success {
            debug!(
                attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                "Bulk update successful"
            );
        } else {
            warn!(
                attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                outstanding = working.len(),
                cancelled,
                "Bulk update failed"
            );
        }

        Ok(DeliveryOutcome {
            success,
            attempts,
            elapsed,
            outstanding: working,
            cancelled,
        })
    }
}
