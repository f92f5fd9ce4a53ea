//! Error types for the metric client.

use metric_delivery::DeliveryError;
use thiserror::Error;

/// Metric client error type.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Request failed a precondition (no metrics, no metric type)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// HTTP transport selected without a user or trusted user
    #[error("HTTP transport requires a user or a trusted user")]
    MissingIdentity,

    /// A user was supplied but no token issuer is configured
    #[error("A token issuer is required to authenticate a user")]
    MissingTokenIssuer,

    /// The retry budget ran out before every metric was confirmed
    #[error(
        "Bulk update failed after {attempts} attempts in {elapsed_ms}ms, {outstanding} metrics outstanding"
    )]
    DeliveryFailed {
        attempts: u32,
        elapsed_ms: u64,
        outstanding: usize,
        cancelled: bool,
    },

    /// Delivery core rejected the batch
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the update endpoint
    #[error("Update endpoint returned {status}: {message}")]
    Rest { status: u16, message: String },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpoint URL could not be built
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// IO error (config file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Redis connection or command error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for metric client operations.
pub type ClientResult<T> = Result<T, ClientError>;
