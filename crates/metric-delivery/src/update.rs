//! Metric update payloads.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification tag carried by every metric update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricType {
    /// A full snapshot of the query metric.
    Complete,
    /// A partial update to be merged by the collector.
    Distributed,
}

impl MetricType {
    /// Wire name used for the `metricType` query parameter and stream field.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Complete => "COMPLETE",
            MetricType::Distributed => "DISTRIBUTED",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MetricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "COMPLETE" => Ok(MetricType::Complete),
            "DISTRIBUTED" => Ok(MetricType::Distributed),
            other => Err(format!("unknown metric type: {}", other)),
        }
    }
}

/// One record to deliver, paired with its metric type.
///
/// The metric body is opaque to the delivery layer. Updates are immutable
/// once constructed; retries clone them into the next round's working set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricUpdate {
    metric: serde_json::Value,
    metric_type: MetricType,
}

impl MetricUpdate {
    /// Create a new metric update.
    pub fn new(metric: serde_json::Value, metric_type: MetricType) -> Self {
        Self {
            metric,
            metric_type,
        }
    }

    /// The metric body.
    pub fn metric(&self) -> &serde_json::Value {
        &self.metric
    }

    /// The metric type.
    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    /// Serialize the update for the wire.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
