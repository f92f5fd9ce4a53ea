//! Error types for metric delivery.

use thiserror::Error;

/// Delivery error type.
///
/// Item-level send rejections and confirm ack timeouts are not errors; they
/// are retried inside the orchestrator and only the terminal outcome is
/// reported. These variants cover requests that must not be attempted at all.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The batch contained no metric updates
    #[error("Batch must contain at least one metric update")]
    EmptyBatch,

    /// Delivery configuration is unusable
    #[error("Invalid delivery configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for delivery operations.
pub type DeliveryResult<T> = Result<T, DeliveryError>;
