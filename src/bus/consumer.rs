use anyhow::{Context, Result};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Headers;
use rdkafka::{Message, Offset, TopicPartitionList};
use std::time::Duration;
use tracing::info;

use super::EVENT_TYPE_HEADER;
use crate::config::KafkaConfig;

/// One message pulled off the bus, with the type tag already extracted from
/// the record header so callers can filter before deserializing.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub event_type: Option<String>,
    pub key: Option<String>,
    pub payload: Vec<u8>,
}

/// Pull-based consumer with manual offset management.
///
/// `enable.auto.commit=false`: an offset is committed only after the
/// message's effect has been applied. A crash before commit means
/// redelivery, which is why every handler must be idempotent.
pub struct EventConsumer {
    consumer: StreamConsumer,
    topics: Vec<String>,
}

impl EventConsumer {
    pub fn new(config: &KafkaConfig, group_id: &str, topics: &[&str]) -> Result<Self> {
        info!(
            brokers = %config.brokers,
            group = group_id,
            topics = ?topics,
            "initializing event consumer"
        );

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("fetch.wait.max.ms", "500")
            .set("session.timeout.ms", "30000")
            .set("heartbeat.interval.ms", "3000")
            .set("max.poll.interval.ms", "300000")
            .create()
            .context("failed to create event consumer")?;

        consumer
            .subscribe(topics)
            .context("failed to subscribe to topics")?;

        Ok(Self {
            consumer,
            topics: topics.iter().map(|t| t.to_string()).collect(),
        })
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Fetch the next message. Blocks until one arrives or the underlying
    /// consumer errors.
    pub async fn recv(&self) -> Result<Delivery> {
        let message = self
            .consumer
            .recv()
            .await
            .context("consumer receive failed")?;

        let event_type = message.headers().and_then(|headers| {
            headers
                .iter()
                .find(|h| h.key.eq_ignore_ascii_case(EVENT_TYPE_HEADER))
                .and_then(|h| h.value)
                .map(|v| String::from_utf8_lossy(v).into_owned())
        });

        Ok(Delivery {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            event_type,
            key: message
                .key()
                .map(|k| String::from_utf8_lossy(k).into_owned()),
            payload: message.payload().map(|p| p.to_vec()).unwrap_or_default(),
        })
    }

    /// Commit the consumer position. Call only after the message's effect
    /// is durably applied.
    pub fn commit(&self) -> Result<()> {
        self.consumer
            .commit_consumer_state(CommitMode::Sync)
            .context("failed to commit offset")?;
        Ok(())
    }

    /// Rewind one partition so the message at `offset` is fetched again.
    /// Used to redeliver a failed message without restarting the consumer.
    pub fn seek_back(&self, topic: &str, partition: i32, offset: i64) -> Result<()> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(topic, partition, Offset::Offset(offset))
            .context("invalid seek target")?;
        self.consumer
            .seek_partitions(tpl, Duration::from_secs(5))
            .context("failed to seek consumer")?;
        Ok(())
    }
}
