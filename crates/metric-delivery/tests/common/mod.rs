//! Test harness for delivery integration tests.
//!
//! Provides:
//! - ScriptedTransport: per-item accept/reject and confirm scripts
//! - Harness: wires transport, registry, ack listener and orchestrator

#![allow(dead_code)]

use metric_delivery::{
    AckListener, ConfirmAck, CorrelationId, CorrelationRegistry, DeliveryConfig, MetricTransport,
    MetricType, MetricUpdate, RetryOrchestrator, RetryPolicy,
};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How the transport confirms an accepted send.
#[derive(Debug, Clone, Copy)]
pub enum Confirm {
    /// Emit the ack as soon as the send is accepted
    Immediately,
    /// Emit the ack after a delay
    After(Duration),
    /// Never emit an ack
    Never,
}

/// A send observed by the transport.
#[derive(Debug, Clone)]
pub struct SendRecord {
    pub query_id: String,
    pub correlation_id: CorrelationId,
    pub accepted: bool,
}

/// Transport driven by per-item scripts keyed by the metric's `queryId`.
///
/// Scripts are consumed one step per send; once a script runs out the
/// default applies.
pub struct ScriptedTransport {
    accept_scripts: Mutex<HashMap<String, VecDeque<bool>>>,
    confirm_scripts: Mutex<HashMap<String, VecDeque<Confirm>>>,
    default_confirm: Mutex<Confirm>,
    sends: Mutex<Vec<SendRecord>>,
    acks: mpsc::Sender<ConfirmAck>,
}

impl ScriptedTransport {
    pub fn new(acks: mpsc::Sender<ConfirmAck>) -> Self {
        Self {
            accept_scripts: Mutex::new(HashMap::new()),
            confirm_scripts: Mutex::new(HashMap::new()),
            default_confirm: Mutex::new(Confirm::Immediately),
            sends: Mutex::new(Vec::new()),
            acks,
        }
    }

    pub fn set_default_confirm(&self, confirm: Confirm) {
        *self.default_confirm.lock().unwrap() = confirm;
    }

    /// Queue accept (`true`) / reject (`false`) outcomes for `query_id`.
    pub fn script_accepts(&self, query_id: &str, outcomes: &[bool]) {
        self.accept_scripts
            .lock()
            .unwrap()
            .entry(query_id.to_string())
            .or_default()
            .extend(outcomes.iter().copied());
    }

    /// Queue confirm behaviours for `query_id`.
    pub fn script_confirms(&self, query_id: &str, confirms: &[Confirm]) {
        self.confirm_scripts
            .lock()
            .unwrap()
            .entry(query_id.to_string())
            .or_default()
            .extend(confirms.iter().copied());
    }

    pub fn sends(&self) -> Vec<SendRecord> {
        self.sends.lock().unwrap().clone()
    }

    pub fn sends_for(&self, query_id: &str) -> Vec<SendRecord> {
        self.sends()
            .into_iter()
            .filter(|s| s.query_id == query_id)
            .collect()
    }

    fn next_accept(&self, query_id: &str) -> bool {
        self.accept_scripts
            .lock()
            .unwrap()
            .get_mut(query_id)
            .and_then(|script| script.pop_front())
            .unwrap_or(true)
    }

    fn next_confirm(&self, query_id: &str) -> Confirm {
        let scripted = self
            .confirm_scripts
            .lock()
            .unwrap()
            .get_mut(query_id)
            .and_then(|script| script.pop_front());
        scripted.unwrap_or_else(|| *self.default_confirm.lock().unwrap())
    }
}

impl MetricTransport for ScriptedTransport {
    fn send(&self, correlation_id: &CorrelationId, update: &MetricUpdate) -> bool {
        let query_id = update.metric()["queryId"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let accepted = self.next_accept(&query_id);

        self.sends.lock().unwrap().push(SendRecord {
            query_id: query_id.clone(),
            correlation_id: correlation_id.clone(),
            accepted,
        });

        if !accepted {
            return false;
        }

        let ack = ConfirmAck::new(correlation_id.clone());
        match self.next_confirm(&query_id) {
            Confirm::Immediately => {
                self.acks.try_send(ack).unwrap();
            }
            Confirm::After(delay) => {
                let acks = self.acks.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = acks.send(ack).await;
                });
            }
            Confirm::Never => {}
        }
        true
    }
}

/// Orchestrator wired to a scripted transport through a live ack listener.
pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub registry: Arc<CorrelationRegistry>,
    pub orchestrator: RetryOrchestrator,
    pub acks: mpsc::Sender<ConfirmAck>,
    _listener: JoinHandle<()>,
}

impl Harness {
    pub fn new(config: DeliveryConfig) -> Self {
        let (ack_tx, ack_rx) = mpsc::channel(1024);
        let registry = Arc::new(CorrelationRegistry::new());
        let listener =
            AckListener::new(registry.clone(), config.confirm_ack_enabled).spawn(ack_rx);
        let transport = Arc::new(ScriptedTransport::new(ack_tx.clone()));
        let orchestrator = RetryOrchestrator::new(config, transport.clone(), registry.clone())
            .expect("valid delivery config");

        Self {
            transport,
            registry,
            orchestrator,
            acks: ack_tx,
            _listener: listener,
        }
    }
}

pub fn config(
    ack_timeout_ms: u64,
    backoff_ms: u64,
    max_attempts: u32,
    fail_timeout_ms: u64,
) -> DeliveryConfig {
    DeliveryConfig {
        confirm_ack_enabled: true,
        confirm_ack_timeout: Duration::from_millis(ack_timeout_ms),
        retry: RetryPolicy {
            max_attempts,
            fail_timeout: Duration::from_millis(fail_timeout_ms),
            backoff_interval: Duration::from_millis(backoff_ms),
        },
    }
}

pub fn update(query_id: &str) -> MetricUpdate {
    MetricUpdate::new(
        json!({ "queryId": query_id, "user": "testuser" }),
        MetricType::Complete,
    )
}

pub fn batch(query_ids: &[&str]) -> Vec<MetricUpdate> {
    query_ids.iter().map(|id| update(id)).collect()
}
