//! Reliable batch delivery of metric updates over an asynchronous transport.
//!
//! A batch is handed to the transport one item at a time, each under a
//! freshly minted correlation ID. When producer confirm acks are enabled the
//! orchestrator then waits for the transport to confirm every accepted item.
//! Items that were rejected or never confirmed form the next round's working
//! set, and rounds repeat until the batch succeeds or the retry budget runs
//! out.
//!
//! # Delivery Contract
//!
//! 1. **At-Least-Once**: retries can deliver an item more than once
//! 2. **Per-Attempt IDs**: a re-sent item always gets a new correlation ID
//! 3. **No Leaks**: every registered ID is removed once its wait returns
//! 4. **Best-Effort**: the loop stops on attempts, elapsed time or cancellation
//!
//! # Architecture
//!
//! ```text
//! caller -> RetryOrchestrator -> BatchSender -> MetricTransport ~~> broker
//!                  |                  |                               |
//!                  |           CorrelationRegistry <- AckListener <---+
//!                  |                  ^
//!                  +--> ConfirmationWaiter
//! ```

pub mod cancel;
pub mod correlation;
pub mod error;
pub mod listener;
pub mod orchestrator;
pub mod sender;
pub mod transport;
pub mod update;
pub mod waiter;

pub use cancel::{cancellation, CancelHandle, CancelSignal};
pub use correlation::{CorrelationId, CorrelationRegistry};
pub use error::{DeliveryError, DeliveryResult};
pub use listener::{AckListener, ConfirmAck};
pub use orchestrator::{
    DeliveryConfig, DeliveryOutcome, DeliveryState, RetryOrchestrator, RetryPolicy,
};
pub use sender::{BatchSender, SendRound};
pub use transport::{ChannelTransport, MetricTransport, OutboundMetric};
pub use update::{MetricType, MetricUpdate};
pub use waiter::ConfirmationWaiter;
