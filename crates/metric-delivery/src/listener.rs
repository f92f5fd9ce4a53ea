//! Producer confirm ack listener.

use crate::correlation::{CorrelationId, CorrelationRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Delivery confirmation emitted by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmAck {
    #[serde(default)]
    pub correlation_id: Option<CorrelationId>,
}

impl ConfirmAck {
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id: Some(correlation_id),
        }
    }
}

/// Receives confirm acks and releases the matching registry slot.
pub struct AckListener {
    registry: Arc<CorrelationRegistry>,
    confirm_ack_enabled: bool,
}

impl AckListener {
    pub fn new(registry: Arc<CorrelationRegistry>, confirm_ack_enabled: bool) -> Self {
        Self {
            registry,
            confirm_ack_enabled,
        }
    }

    /// Handle one confirm ack. Returns whether a pending wait was released.
    ///
    /// Missing or unknown correlation IDs are logged and ignored.
    pub fn process_confirm_ack(&self, ack: &ConfirmAck) -> bool {
        if !self.confirm_ack_enabled {
            return false;
        }

        match &ack.correlation_id {
            Some(correlation_id) => self.registry.signal(correlation_id),
            None => {
                warn!("No correlation ID found in confirm ack message");
                false
            }
        }
    }

    /// Consume `acks` on a background task until the channel closes.
    pub fn spawn(self, mut acks: mpsc::Receiver<ConfirmAck>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(ack) = acks.recv().await {
                self.process_confirm_ack(&ack);
            }
            debug!("Confirm ack channel closed, listener exiting");
        })
    }
}
