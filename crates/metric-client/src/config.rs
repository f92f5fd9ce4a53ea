//! Configuration for the metric client.

use crate::error::{ClientError, ClientResult};
use metric_delivery::{DeliveryConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "METRIC_CLIENT_";

/// How metric updates leave the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    /// Message broker with confirm acks and retry
    #[default]
    Message,
    /// Plain HTTP request, no retry
    Http,
    /// HTTPS request, no retry
    Https,
}

impl TransportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportType::Message => "message",
            TransportType::Http => "http",
            TransportType::Https => "https",
        }
    }

    pub fn is_http(&self) -> bool {
        matches!(self, TransportType::Http | TransportType::Https)
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "message" => Ok(TransportType::Message),
            "http" => Ok(TransportType::Http),
            "https" => Ok(TransportType::Https),
            other => Err(format!("unknown transport type: {}", other)),
        }
    }
}

/// Retry budget for message delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryProperties {
    pub max_attempts: u32,
    pub fail_timeout_millis: u64,
    pub backoff_interval_millis: u64,
}

impl Default for RetryProperties {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            fail_timeout_millis: 5 * 60 * 1000,
            backoff_interval_millis: 5000,
        }
    }
}

/// Redis Streams broker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisProperties {
    pub url: String,
    pub stream_key: String,
}

impl Default for RedisProperties {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            stream_key: "querymetric:updates".to_string(),
        }
    }
}

/// Metric client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricClientConfig {
    /// Master switch; a disabled client refuses every submission.
    pub enabled: bool,
    /// Transport used by `MetricClient::submit`.
    pub transport: TransportType,

    /// Update endpoint location for the HTTP transports.
    pub scheme: String,
    pub host: String,
    pub port: u16,
    /// Path for a single metric.
    pub update_metric_url: String,
    /// Path for a list of metrics.
    pub update_metrics_url: String,
    pub request_timeout_secs: u64,

    pub confirm_ack_enabled: bool,
    pub confirm_ack_timeout_millis: u64,
    pub retry: RetryProperties,

    /// Capacity of the outbound message buffer. Sends beyond it are rejected.
    pub message_buffer_capacity: usize,
    pub redis: RedisProperties,
}

impl Default for MetricClientConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            transport: TransportType::Message,
            scheme: "https".to_string(),
            host: "localhost".to_string(),
            port: 8443,
            update_metric_url: "/querymetric/v1/updateMetric".to_string(),
            update_metrics_url: "/querymetric/v1/updateMetrics".to_string(),
            request_timeout_secs: 30,
            confirm_ack_enabled: true,
            confirm_ack_timeout_millis: 500,
            retry: RetryProperties::default(),
            message_buffer_capacity: 1024,
            redis: RedisProperties::default(),
        }
    }
}

impl MetricClientConfig {
    /// Load from an optional JSON file, apply environment overrides, validate.
    pub fn load(path: Option<&Path>) -> ClientResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.load_from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file. Missing keys take defaults.
    pub fn load_from_file(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MetricClientConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> ClientResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override from `METRIC_CLIENT_*` environment variables.
    pub fn load_from_env(&mut self) -> ClientResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Override from any key lookup. Keys are the `METRIC_CLIENT_*` names.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ClientResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(v) = get("ENABLED") {
            self.enabled = parse_var("ENABLED", &v)?;
        }
        if let Some(v) = get("TRANSPORT") {
            self.transport = v.parse().map_err(ClientError::Config)?;
        }
        if let Some(v) = get("SCHEME") {
            self.scheme = v;
        }
        if let Some(v) = get("HOST") {
            self.host = v;
        }
        if let Some(v) = get("PORT") {
            self.port = parse_var("PORT", &v)?;
        }
        if let Some(v) = get("CONFIRM_ACK_ENABLED") {
            self.confirm_ack_enabled = parse_var("CONFIRM_ACK_ENABLED", &v)?;
        }
        if let Some(v) = get("CONFIRM_ACK_TIMEOUT_MILLIS") {
            self.confirm_ack_timeout_millis = parse_var("CONFIRM_ACK_TIMEOUT_MILLIS", &v)?;
        }
        if let Some(v) = get("RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = parse_var("RETRY_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = get("RETRY_FAIL_TIMEOUT_MILLIS") {
            self.retry.fail_timeout_millis = parse_var("RETRY_FAIL_TIMEOUT_MILLIS", &v)?;
        }
        if let Some(v) = get("RETRY_BACKOFF_INTERVAL_MILLIS") {
            self.retry.backoff_interval_millis = parse_var("RETRY_BACKOFF_INTERVAL_MILLIS", &v)?;
        }
        if let Some(v) = get("REDIS_URL") {
            self.redis.url = v;
        }
        if let Some(v) = get("REDIS_STREAM_KEY") {
            self.redis.stream_key = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.scheme != "http" && self.scheme != "https" {
            return Err(ClientError::Config(format!(
                "scheme must be http or https, got {}",
                self.scheme
            )));
        }
        if self.host.trim().is_empty() {
            return Err(ClientError::Config("host must not be empty".to_string()));
        }
        for path in [&self.update_metric_url, &self.update_metrics_url] {
            if !path.starts_with('/') {
                return Err(ClientError::Config(format!(
                    "update path must start with '/': {}",
                    path
                )));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(ClientError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.message_buffer_capacity == 0 {
            return Err(ClientError::Config(
                "message_buffer_capacity must be positive".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ClientError::Config(
                "retry.max_attempts must be positive".to_string(),
            ));
        }
        self.delivery_config()
            .validate()
            .map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Settings for the delivery core.
    pub fn delivery_config(&self) -> DeliveryConfig {
        DeliveryConfig {
            confirm_ack_enabled: self.confirm_ack_enabled,
            confirm_ack_timeout: Duration::from_millis(self.confirm_ack_timeout_millis),
            retry: RetryPolicy {
                max_attempts: self.retry.max_attempts,
                fail_timeout: Duration::from_millis(self.retry.fail_timeout_millis),
                backoff_interval: Duration::from_millis(self.retry.backoff_interval_millis),
            },
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Update endpoint URL, without query parameters.
    ///
    /// Both HTTP transports use the configured scheme.
    pub fn endpoint_url(&self, single: bool) -> ClientResult<Url> {
        let path = if single {
            &self.update_metric_url
        } else {
            &self.update_metrics_url
        };
        let url = Url::parse(&format!("{}://{}:{}", self.scheme, self.host, self.port))?.join(path)?;
        Ok(url)
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> ClientResult<T> {
    value.trim().parse().map_err(|_| {
        ClientError::Config(format!(
            "invalid value for {}{}: {}",
            ENV_PREFIX, name, value
        ))
    })
}
