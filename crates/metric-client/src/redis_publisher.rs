//! Redis Streams publisher for the message transport.
//!
//! Drains the outbound metric channel, appends each update to the stream
//! with XADD and reports the accepted entry back as a confirm ack.

use crate::config::RedisProperties;
use crate::error::{ClientError, ClientResult};
use metric_delivery::{ConfirmAck, OutboundMetric};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisResult};
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Stream entry fields for one outbound metric.
pub fn stream_fields(outbound: &OutboundMetric) -> ClientResult<Vec<(&'static str, String)>> {
    Ok(vec![
        ("correlation_id", outbound.correlation_id.to_string()),
        ("metric_type", outbound.update.metric_type().as_str().to_string()),
        ("payload", serde_json::to_string(outbound.update.metric())?),
    ])
}

/// Append-only stream writer used by the publisher.
pub trait StreamWriter: Send + 'static {
    /// XADD `fields` to `stream_key`, returning the new entry ID.
    fn xadd(
        &mut self,
        stream_key: &str,
        fields: &[(&'static str, String)],
    ) -> impl Future<Output = RedisResult<String>> + Send;

    /// Re-establish the connection after an error.
    fn reconnect(&mut self) -> impl Future<Output = RedisResult<()>> + Send;
}

/// Live Redis connection.
pub struct RedisConnection {
    client: Client,
    conn: MultiplexedConnection,
}

impl RedisConnection {
    pub async fn open(url: &str) -> ClientResult<Self> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { client, conn })
    }
}

impl StreamWriter for RedisConnection {
    fn xadd(
        &mut self,
        stream_key: &str,
        fields: &[(&'static str, String)],
    ) -> impl Future<Output = RedisResult<String>> + Send {
        async move {
            let entry_id: String = self.conn.xadd(stream_key, "*", fields).await?;
            Ok(entry_id)
        }
    }

    fn reconnect(&mut self) -> impl Future<Output = RedisResult<()>> + Send {
        async move {
            self.conn = self.client.get_multiplexed_async_connection().await?;
            Ok(())
        }
    }
}

/// Publishes outbound metrics to a Redis stream.
pub struct RedisStreamPublisher<W = RedisConnection> {
    writer: W,
    stream_key: String,
    acks: mpsc::Sender<ConfirmAck>,
}

impl RedisStreamPublisher<RedisConnection> {
    /// Connect to Redis. Confirm acks for accepted entries go to `acks`.
    pub async fn connect(
        properties: &RedisProperties,
        acks: mpsc::Sender<ConfirmAck>,
    ) -> ClientResult<Self> {
        let writer = RedisConnection::open(&properties.url).await?;

        info!(stream = %properties.stream_key, "Connected metric publisher to Redis");

        Ok(Self::new(writer, properties.stream_key.clone(), acks))
    }
}

impl<W: StreamWriter> RedisStreamPublisher<W> {
    pub fn new(writer: W, stream_key: String, acks: mpsc::Sender<ConfirmAck>) -> Self {
        Self {
            writer,
            stream_key,
            acks,
        }
    }

    /// Append one metric to the stream and return the entry ID.
    pub async fn publish(&mut self, outbound: &OutboundMetric) -> ClientResult<String> {
        let fields = stream_fields(outbound)?;
        let entry_id = self.writer.xadd(&self.stream_key, &fields).await?;

        debug!(
            correlation_id = %outbound.correlation_id,
            entry_id = %entry_id,
            stream = %self.stream_key,
            "Published metric update"
        );

        Ok(entry_id)
    }

    /// Publish until the outbound channel closes.
    ///
    /// Failed publishes emit no ack, so the waiter times out and the metric
    /// is retried under a new correlation ID.
    pub async fn run(mut self, mut outbound: mpsc::Receiver<OutboundMetric>) {
        while let Some(message) = outbound.recv().await {
            match self.publish(&message).await {
                Ok(_) => {
                    let ack = ConfirmAck::new(message.correlation_id);
                    if self.acks.send(ack).await.is_err() {
                        debug!("Confirm ack channel closed, dropping ack");
                    }
                }
                Err(ClientError::Redis(e)) => {
                    warn!(
                        correlation_id = %message.correlation_id,
                        error = %e,
                        "Failed to publish metric update"
                    );
                    if let Err(e) = self.reconnect().await {
                        warn!(error = %e, "Redis reconnect failed");
                    }
                }
                Err(e) => {
                    warn!(
                        correlation_id = %message.correlation_id,
                        error = %e,
                        "Dropping unpublishable metric update"
                    );
                }
            }
        }

        debug!("Outbound metric channel closed, publisher stopping");
    }

    pub fn spawn(self, outbound: mpsc::Receiver<OutboundMetric>) -> JoinHandle<()> {
        tokio::spawn(self.run(outbound))
    }

    /// Reconnect to Redis.
    pub async fn reconnect(&mut self) -> ClientResult<()> {
        info!("Reconnecting to Redis...");
        self.writer.reconnect().await?;
        Ok(())
    }
}
