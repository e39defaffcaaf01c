use anyhow::{Context, Result};
use rdkafka::config::ClientConfig;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::metrics;
use super::types::DomainEvent;
use super::EVENT_TYPE_HEADER;
use crate::config::KafkaConfig;

/// Event producer with at-least-once delivery.
///
/// A successful ack guarantees durability; a retry after a network error may
/// append a duplicate record, so every consumer must be idempotent. The
/// event type is written as a record header so consumers can filter without
/// deserializing payloads.
pub struct EventProducer {
    producer: Arc<FutureProducer>,
}

impl EventProducer {
    /// Create a producer from the application Kafka configuration.
    ///
    /// - `acks=all`: wait for all in-sync replicas.
    /// - `enable.idempotence=true`: no duplicates within a producer session.
    /// - bounded request and delivery timeouts so a dead broker surfaces as
    ///   an error instead of an unbounded hang.
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        info!(brokers = %config.brokers, "initializing event producer");

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .set("max.in.flight.requests.per.connection", "5")
            .set("retries", "2147483647")
            .set("compression.type", "zstd")
            .set("linger.ms", "10")
            .set("request.timeout.ms", "30000")
            .set("delivery.timeout.ms", "120000")
            .create()
            .context("failed to create event producer")?;

        Ok(Self {
            producer: Arc::new(producer),
        })
    }

    /// Publish one event to `topic`, keyed by the event's partition key.
    ///
    /// Blocks until the broker acks or the delivery timeout lapses.
    pub async fn publish(&self, topic: &str, event: &DomainEvent) -> Result<(i32, i64)> {
        let payload = event.to_payload()?;
        let key = event.partition_key().to_string();

        let headers = OwnedHeaders::new().insert(Header {
            key: EVENT_TYPE_HEADER,
            value: Some(event.event_type()),
        });

        let record = FutureRecord::to(topic)
            .key(&key)
            .payload(&payload)
            .headers(headers);

        let start = std::time::Instant::now();

        match self
            .producer
            .send(record, Timeout::After(Duration::from_secs(5)))
            .await
        {
            Ok((partition, offset)) => {
                metrics::BUS_PUBLISH_SUCCESS.inc();
                metrics::BUS_PUBLISH_LATENCY.observe(start.elapsed().as_secs_f64());

                info!(
                    topic = topic,
                    event_type = event.event_type(),
                    key = %key,
                    partition = partition,
                    offset = offset,
                    "event published"
                );

                Ok((partition, offset))
            }
            Err((kafka_err, _)) => {
                metrics::BUS_PUBLISH_FAILURE.inc();

                error!(
                    topic = topic,
                    event_type = event.event_type(),
                    key = %key,
                    error = %kafka_err,
                    "failed to publish event"
                );

                Err(anyhow::anyhow!("publish failed: {}", kafka_err))
            }
        }
    }

    /// Publish raw bytes to a quarantine topic, preserving the original
    /// type tag. Used by the consumer loop for messages that exhausted
    /// their delivery attempts.
    pub async fn publish_raw(
        &self,
        topic: &str,
        key: Option<&str>,
        event_type: Option<&str>,
        payload: &[u8],
    ) -> Result<()> {
        let mut headers = OwnedHeaders::new();
        if let Some(tag) = event_type {
            headers = headers.insert(Header {
                key: EVENT_TYPE_HEADER,
                value: Some(tag),
            });
        }

        let mut record = FutureRecord::to(topic).payload(payload).headers(headers);
        if let Some(k) = key {
            record = record.key(k);
        }

        self.producer
            .send(record, Timeout::After(Duration::from_secs(5)))
            .await
            .map_err(|(e, _)| anyhow::anyhow!("quarantine publish failed: {}", e))?;

        Ok(())
    }

    /// Wait for all in-flight publishes to be acked. Called on shutdown.
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        self.producer
            .flush(Timeout::After(timeout))
            .context("failed to flush event producer")?;
        Ok(())
    }
}

// Clone shares the underlying producer; publishes are safe concurrently.
impl Clone for EventProducer {
    fn clone(&self) -> Self {
        Self {
            producer: Arc::clone(&self.producer),
        }
    }
}
