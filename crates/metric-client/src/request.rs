//! Metric update requests.

use crate::error::{ClientError, ClientResult};
use metric_delivery::{MetricType, MetricUpdate};
use serde_json::Value;

/// User authenticated with a bearer token on the HTTP transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    /// Principals the request is made on behalf of.
    pub proxied_users: Vec<String>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            proxied_users: Vec::new(),
        }
    }

    pub fn with_proxied_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.proxied_users = users.into_iter().map(Into::into).collect();
        self
    }
}

/// Mutually authenticated principal, forwarded as certificate DN headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedUser {
    pub subject_dn: String,
    pub issuer_dn: String,
}

impl TrustedUser {
    pub fn new(subject_dn: impl Into<String>, issuer_dn: impl Into<String>) -> Self {
        Self {
            subject_dn: subject_dn.into(),
            issuer_dn: issuer_dn.into(),
        }
    }
}

/// A batch of metric updates plus the identity to submit them under.
#[derive(Debug, Clone, Default)]
pub struct Request {
    metrics: Vec<Value>,
    metric_type: Option<MetricType>,
    user: Option<User>,
    trusted_user: Option<TrustedUser>,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    pub fn metrics(&self) -> &[Value] {
        &self.metrics
    }

    pub fn metric_type(&self) -> Option<MetricType> {
        self.metric_type
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn trusted_user(&self) -> Option<&TrustedUser> {
        self.trusted_user.as_ref()
    }

    /// Check the transport-independent preconditions.
    pub fn validate(&self) -> ClientResult<MetricType> {
        if self.metrics.is_empty() {
            return Err(ClientError::InvalidRequest(
                "metrics must not be empty".to_string(),
            ));
        }
        self.metric_type
            .ok_or_else(|| ClientError::InvalidRequest("metric type is required".to_string()))
    }

    /// One `MetricUpdate` per metric, all tagged with the request's type.
    pub fn to_updates(&self) -> ClientResult<Vec<MetricUpdate>> {
        let metric_type = self.validate()?;
        Ok(self
            .metrics
            .iter()
            .cloned()
            .map(|metric| MetricUpdate::new(metric, metric_type))
            .collect())
    }
}

/// Builder for [`Request`].
#[derive(Debug, Default)]
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    /// Append one metric.
    pub fn metric(mut self, metric: Value) -> Self {
        self.request.metrics.push(metric);
        self
    }

    /// Append several metrics.
    pub fn metrics<I>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.request.metrics.extend(metrics);
        self
    }

    pub fn metric_type(mut self, metric_type: MetricType) -> Self {
        self.request.metric_type = Some(metric_type);
        self
    }

    pub fn user(mut self, user: User) -> Self {
        self.request.user = Some(user);
        self
    }

    pub fn trusted_user(mut self, trusted_user: TrustedUser) -> Self {
        self.request.trusted_user = Some(trusted_user);
        self
    }

    pub fn build(self) -> Request {
        self.request
    }
}
