//! Query metric update client.
//!
//! Submits metric updates either over a message broker, with per-item
//! confirm acks and bounded retry, or directly to the update endpoint over
//! HTTP(S) as a single request with no retry.
//!
//! # Architecture
//!
//! ```text
//!                 +--> RestSubmitter ------------------> update endpoint
//!                 |
//! MetricClient ---+--> RetryOrchestrator -> ChannelTransport
//!                              ^                   |
//!                              |                   v
//!                   AckListener <-- ConfirmAck -- RedisStreamPublisher --> Redis stream
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod redis_publisher;
pub mod request;
pub mod rest;

pub use auth::{StaticTokenIssuer, TokenIssuer};
pub use client::MetricClient;
pub use config::{MetricClientConfig, RedisProperties, RetryProperties, TransportType};
pub use error::{ClientError, ClientResult};
pub use metric_delivery::{cancellation, CancelHandle, CancelSignal, MetricType};
pub use redis_publisher::{RedisConnection, RedisStreamPublisher, StreamWriter};
pub use request::{Request, RequestBuilder, TrustedUser, User};
pub use rest::RestSubmitter;
