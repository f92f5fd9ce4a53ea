//! Caller-facing metric client.

use crate::auth::TokenIssuer;
use crate::config::{MetricClientConfig, TransportType};
use crate::error::{ClientError, ClientResult};
use crate::redis_publisher::RedisStreamPublisher;
use crate::request::Request;
use crate::rest::RestSubmitter;
use metric_delivery::{
    AckListener, CancelSignal, ChannelTransport, CorrelationRegistry, MetricTransport,
    RetryOrchestrator,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Capacity of the confirm ack channel between publisher and listener.
const ACK_CHANNEL_CAPACITY: usize = 1024;

/// Submits metric updates over the message transport or the HTTP fallback.
pub struct MetricClient {
    config: Arc<MetricClientConfig>,
    rest: RestSubmitter,
    orchestrator: Option<RetryOrchestrator>,
    registry: Arc<CorrelationRegistry>,
    background: Vec<JoinHandle<()>>,
}

impl MetricClient {
    /// Client with only the HTTP transports available.
    pub fn new(config: MetricClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        Ok(Self {
            rest: RestSubmitter::new(config.clone(), None)?,
            config,
            orchestrator: None,
            registry: Arc::new(CorrelationRegistry::new()),
            background: Vec::new(),
        })
    }

    /// Client delivering messages through `transport`.
    ///
    /// Confirm acks for `transport` must be routed to an [`AckListener`]
    /// over the same `registry`.
    pub fn with_transport(
        config: MetricClientConfig,
        transport: Arc<dyn MetricTransport>,
        registry: Arc<CorrelationRegistry>,
    ) -> ClientResult<Self> {
        let mut client = Self::new(config)?;
        client.orchestrator = Some(RetryOrchestrator::new(
            client.config.delivery_config(),
            transport,
            registry.clone(),
        )?);
        client.registry = registry;
        Ok(client)
    }

    /// Client delivering messages through the configured Redis stream.
    ///
    /// Spawns the stream publisher and the ack listener; call
    /// [`MetricClient::shutdown`] to drain them.
    pub async fn connect(config: MetricClientConfig) -> ClientResult<Self> {
        let (transport, outbound) = ChannelTransport::new(config.message_buffer_capacity);
        let (ack_tx, ack_rx) = mpsc::channel(ACK_CHANNEL_CAPACITY);
        let publisher = RedisStreamPublisher::connect(&config.redis, ack_tx).await?;

        let registry = Arc::new(CorrelationRegistry::new());
        let listener = AckListener::new(registry.clone(), config.confirm_ack_enabled);

        let mut client = Self::with_transport(config, Arc::new(transport), registry)?;
        client.background.push(publisher.spawn(outbound));
        client.background.push(listener.spawn(ack_rx));

        info!(
            stream = %client.config.redis.stream_key,
            confirm_ack_enabled = client.config.confirm_ack_enabled,
            "Metric client connected"
        );
        Ok(client)
    }

    /// Use `issuer` to mint bearer tokens for requests carrying a user.
    pub fn with_token_issuer(mut self, issuer: Arc<dyn TokenIssuer>) -> ClientResult<Self> {
        self.rest = RestSubmitter::new(self.config.clone(), Some(issuer))?;
        Ok(self)
    }

    pub fn config(&self) -> &MetricClientConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Submit over the configured transport.
    pub async fn submit(&self, request: Request) -> ClientResult<()> {
        self.dispatch(request, self.config.transport, CancelSignal::never())
            .await
    }

    /// Submit over `transport` regardless of configuration.
    pub async fn submit_via(&self, request: Request, transport: TransportType) -> ClientResult<()> {
        self.dispatch(request, transport, CancelSignal::never()).await
    }

    /// Submit over the configured transport; `cancel` stops a message
    /// delivery between rounds.
    pub async fn submit_cancellable(
        &self,
        request: Request,
        cancel: CancelSignal,
    ) -> ClientResult<()> {
        self.dispatch(request, self.config.transport, cancel).await
    }

    async fn dispatch(
        &self,
        request: Request,
        transport: TransportType,
        cancel: CancelSignal,
    ) -> ClientResult<()> {
        if !self.is_enabled() {
            return Err(ClientError::Config("metric client is disabled".to_string()));
        }

        match transport {
            TransportType::Message => self.deliver_messages(&request, cancel).await,
            TransportType::Http | TransportType::Https => self.rest.submit(&request).await,
        }
    }

    async fn deliver_messages(&self, request: &Request, cancel: CancelSignal) -> ClientResult<()> {
        let updates = request.to_updates()?;
        let orchestrator = self.orchestrator.as_ref().ok_or_else(|| {
            ClientError::Config("message transport is not connected".to_string())
        })?;

        debug!(metrics = updates.len(), "Delivering metric updates");
        let outcome = orchestrator.deliver_with_cancel(updates, cancel).await?;

        if outcome.success {
            Ok(())
        } else {
            Err(ClientError::DeliveryFailed {
                attempts: outcome.attempts,
                elapsed_ms: outcome.elapsed.as_millis() as u64,
                outstanding: outcome.outstanding.len(),
                cancelled: outcome.cancelled,
            })
        }
    }

    /// Stop background tasks after draining queued messages.
    ///
    /// Dropping the transport closes the publisher's channel; the publisher
    /// then drops its ack sender, which stops the listener.
    pub async fn shutdown(self) {
        let MetricClient {
            orchestrator,
            registry,
            background,
            ..
        } = self;
        drop(orchestrator);

        for handle in background {
            let _ = handle.await;
        }
        registry.clear();
        debug!("Metric client stopped");
    }
}
