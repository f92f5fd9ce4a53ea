//! Transport adapter boundary.

use crate::correlation::CorrelationId;
use crate::update::MetricUpdate;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Accept-or-reject send primitive of the message transport.
///
/// `send` must not block: `true` means the message was accepted into the
/// transport, `false` means it was rejected (for example a full buffer).
/// An accepted message may later be confirmed out of band by an ack carrying
/// the same correlation ID.
pub trait MetricTransport: Send + Sync {
    fn send(&self, correlation_id: &CorrelationId, update: &MetricUpdate) -> bool;
}

/// A metric update handed to the transport, tagged with its correlation ID.
#[derive(Debug, Clone)]
pub struct OutboundMetric {
    pub correlation_id: CorrelationId,
    pub update: MetricUpdate,
}

/// In-process transport backed by a bounded channel.
///
/// A publisher task drains the receiving end and forwards messages to the
/// broker. A full channel surfaces as an ordinary rejected send.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    sender: mpsc::Sender<OutboundMetric>,
}

impl ChannelTransport {
    /// Create a transport with room for `capacity` buffered messages.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OutboundMetric>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl MetricTransport for ChannelTransport {
    fn send(&self, correlation_id: &CorrelationId, update: &MetricUpdate) -> bool {
        let message = OutboundMetric {
            correlation_id: correlation_id.clone(),
            update: update.clone(),
        };

        match self.sender.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(correlation_id = %correlation_id, "Transport buffer full, rejecting send");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(correlation_id = %correlation_id, "Transport closed, rejecting send");
                false
            }
        }
    }
}
