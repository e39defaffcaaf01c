use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::consumer::{Delivery, EventConsumer};
use super::metrics;
use super::producer::EventProducer;
use super::types::DomainEvent;
use crate::config::MAX_DELIVERY_ATTEMPTS;

/// A consumer's effect on local state. Handlers must be idempotent: the bus
/// is at-least-once, so the same event can arrive more than once.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Event tags this handler cares about; everything else is committed
    /// without deserialization.
    fn subscribed_types(&self) -> &[&str];

    async fn handle(&self, event: DomainEvent) -> Result<()>;
}

/// Sink for messages that exhausted their delivery attempts or cannot be
/// decoded. In production this is the quarantine-topic producer.
#[async_trait]
pub trait QuarantineSink: Send + Sync {
    async fn divert(
        &self,
        topic: &str,
        key: Option<&str>,
        event_type: Option<&str>,
        payload: &[u8],
    ) -> Result<()>;
}

#[async_trait]
impl QuarantineSink for EventProducer {
    async fn divert(
        &self,
        topic: &str,
        key: Option<&str>,
        event_type: Option<&str>,
        payload: &[u8],
    ) -> Result<()> {
        self.publish_raw(topic, key, event_type, payload).await
    }
}

/// Decision for one delivery attempt, tracked per (partition, offset).
#[derive(Debug, PartialEq)]
enum Disposition {
    Commit,
    Retry,
    Quarantine,
}

/// In-memory attempt counter keyed by log position. A position that keeps
/// failing is reported as exhausted so the loop can quarantine it.
#[derive(Default)]
pub struct RetryTracker {
    attempts: HashMap<(String, i32, i64), u32>,
}

impl RetryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed attempt; returns the new attempt count.
    pub fn record_failure(&mut self, topic: &str, partition: i32, offset: i64) -> u32 {
        let count = self
            .attempts
            .entry((topic.to_string(), partition, offset))
            .or_insert(0);
        *count += 1;
        *count
    }

    pub fn is_exhausted(&self, topic: &str, partition: i32, offset: i64) -> bool {
        self.attempts
            .get(&(topic.to_string(), partition, offset))
            .is_some_and(|count| *count >= MAX_DELIVERY_ATTEMPTS)
    }

    pub fn clear(&mut self, topic: &str, partition: i32, offset: i64) {
        self.attempts.remove(&(topic.to_string(), partition, offset));
    }
}

/// Run a consumer loop until the shutdown signal flips.
///
/// Per message:
/// - unknown/unsubscribed event types are committed immediately (cheap
///   filter on the header tag, no payload deserialization);
/// - a handler error leaves the offset uncommitted and seeks back so the
///   same message is fetched again;
/// - after `MAX_DELIVERY_ATTEMPTS` failures the raw message is published to
///   `<topic>.quarantine` and the offset committed, so one poison message
///   cannot block the partition forever.
///
/// Shutdown is cooperative: the signal is observed between fetches, and an
/// in-flight message is drained before the loop exits.
pub async fn run_consumer_loop(
    consumer: EventConsumer,
    quarantine_producer: EventProducer,
    handler: impl EventHandler,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let mut attempts = RetryTracker::new();

    info!(topics = ?consumer.topics(), "consumer loop started");

    loop {
        let delivery = tokio::select! {
            _ = shutdown.changed() => {
                info!("shutdown signal received, consumer loop exiting");
                break;
            }
            result = consumer.recv() => match result {
                Ok(delivery) => delivery,
                Err(e) => {
                    error!(error = %e, "fetch failed, continuing");
                    continue;
                }
            },
        };

        match dispose(&quarantine_producer, &handler, &mut attempts, &delivery).await {
            Disposition::Commit => {
                if let Err(e) = consumer.commit() {
                    error!(error = %e, "offset commit failed");
                }
            }
            Disposition::Retry => {
                if let Err(e) = consumer.seek_back(&delivery.topic, delivery.partition, delivery.offset) {
                    error!(error = %e, "seek failed, message will wait for rebalance");
                }
            }
            Disposition::Quarantine => {
                metrics::BUS_QUARANTINED.inc();
                if let Err(e) = consumer.commit() {
                    error!(error = %e, "offset commit failed after quarantine");
                }
            }
        }
    }

    Ok(())
}

async fn dispose(
    sink: &dyn QuarantineSink,
    handler: &impl EventHandler,
    attempts: &mut RetryTracker,
    delivery: &Delivery,
) -> Disposition {
    let event_type = match delivery.event_type.as_deref() {
        Some(tag) if handler.subscribed_types().contains(&tag) => tag,
        other => {
            tracing::debug!(event_type = ?other, "ignoring event type");
            return Disposition::Commit;
        }
    };

    let event = match DomainEvent::decode(event_type, &delivery.payload) {
        Ok(Some(event)) => event,
        Ok(None) => return Disposition::Commit,
        Err(e) => {
            // Malformed payload for a known tag: retrying cannot help.
            warn!(event_type = event_type, error = %e, "malformed payload, quarantining");
            return quarantine(sink, delivery, &e.to_string()).await;
        }
    };

    match handler.handle(event).await {
        Ok(()) => {
            metrics::BUS_CONSUME_SUCCESS.inc();
            attempts.clear(&delivery.topic, delivery.partition, delivery.offset);
            Disposition::Commit
        }
        Err(e) => {
            metrics::BUS_CONSUME_FAILURE.inc();
            let count =
                attempts.record_failure(&delivery.topic, delivery.partition, delivery.offset);

            if count >= MAX_DELIVERY_ATTEMPTS {
                error!(
                    topic = %delivery.topic,
                    partition = delivery.partition,
                    offset = delivery.offset,
                    attempts = count,
                    error = %e,
                    "delivery attempts exhausted, quarantining"
                );
                attempts.clear(&delivery.topic, delivery.partition, delivery.offset);
                quarantine(sink, delivery, &e.to_string()).await
            } else {
                warn!(
                    topic = %delivery.topic,
                    partition = delivery.partition,
                    offset = delivery.offset,
                    attempt = count,
                    error = %e,
                    "handler failed, message left for redelivery"
                );
                Disposition::Retry
            }
        }
    }
}

async fn quarantine(
    sink: &dyn QuarantineSink,
    delivery: &Delivery,
    reason: &str,
) -> Disposition {
    let quarantine_topic = format!("{}.quarantine", delivery.topic);
    match sink
        .divert(
            &quarantine_topic,
            delivery.key.as_deref(),
            delivery.event_type.as_deref(),
            &delivery.payload,
        )
        .await
    {
        Ok(()) => {
            warn!(
                topic = %quarantine_topic,
                offset = delivery.offset,
                reason = reason,
                "message quarantined"
            );
            Disposition::Quarantine
        }
        Err(e) => {
            // Quarantine topic unreachable: keep the message on the source
            // topic rather than dropping it.
            error!(error = %e, "quarantine publish failed, retrying message instead");
            Disposition::Retry
        }
    }
}
