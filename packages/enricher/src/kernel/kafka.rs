//! Kafka client adapters for consuming and publishing artefacts.
//!
//! `KafkaSource` wraps a `StreamConsumer` subscribed to the artefact topic and
//! `KafkaPublisher` wraps a `FutureProducer`. Test doubles for both traits
//! live in `test_dependencies`.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::{ClientConfig, Message};
use tracing::{debug, info};

use super::{BaseArtefactPublisher, BaseMessageSource};
use crate::common::InboundMessage;
use crate::config::Config;

// =============================================================================
// Consumer
// =============================================================================

/// Consumer-group member reading the artefact topic.
///
/// Offsets are auto-committed as messages are handed out, so a message is
/// never redelivered because its processing failed.
pub struct KafkaSource {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaSource {
    pub fn new(config: &Config, client_id: &str) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka_bootstrap_servers)
            .set("group.id", &config.kafka_group_id)
            .set("client.id", client_id)
            .set("auto.offset.reset", &config.kafka_auto_offset_reset)
            .set("enable.auto.commit", "true")
            .create()
            .context("Failed to create Kafka consumer")?;

        consumer
            .subscribe(&[config.kafka_topic_consume.as_str()])
            .with_context(|| format!("Failed to subscribe to {}", config.kafka_topic_consume))?;

        info!(
            topic = %config.kafka_topic_consume,
            group_id = %config.kafka_group_id,
            "Kafka consumer subscribed"
        );

        Ok(Self {
            consumer,
            topic: config.kafka_topic_consume.clone(),
        })
    }
}

#[async_trait]
impl BaseMessageSource for KafkaSource {
    async fn poll(&self, timeout: Duration) -> Result<Option<InboundMessage>> {
        let message = match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Err(_elapsed) => return Ok(None),
            Ok(result) => result.context("Consumer error")?,
        };

        Ok(Some(InboundMessage {
            key: message.key().map(<[u8]>::to_vec),
            payload: message.payload().map(<[u8]>::to_vec),
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.consumer.unsubscribe();
        info!(topic = %self.topic, "Kafka consumer unsubscribed");
        Ok(())
    }
}

// =============================================================================
// Producer
// =============================================================================

/// Publishes enriched artefacts and waits for the delivery report.
pub struct KafkaPublisher {
    producer: FutureProducer,
    topic: String,
    delivery_timeout: Duration,
}

impl KafkaPublisher {
    pub fn new(config: &Config) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka_bootstrap_servers)
            .set(
                "message.timeout.ms",
                config.kafka_delivery_timeout.as_millis().to_string(),
            )
            .create()
            .context("Failed to create Kafka producer")?;

        Ok(Self {
            producer,
            topic: config.kafka_topic_produce.clone(),
            delivery_timeout: config.kafka_delivery_timeout,
        })
    }
}

#[async_trait]
impl BaseArtefactPublisher for KafkaPublisher {
    async fn publish(&self, key: String, payload: Bytes) -> Result<()> {
        let record = FutureRecord::to(&self.topic)
            .key(&key)
            .payload(payload.as_ref());

        let (partition, offset) = self
            .producer
            .send(record, Timeout::After(self.delivery_timeout))
            .await
            .map_err(|(e, _message)| anyhow!(e))
            .with_context(|| format!("Failed to deliver {} to {}", key, self.topic))?;

        debug!(
            key = %key,
            topic = %self.topic,
            partition = partition,
            offset = offset,
            "message delivered"
        );

        Ok(())
    }
}
