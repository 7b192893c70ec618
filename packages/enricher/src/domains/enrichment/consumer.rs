//! Consumption loop for the artefact topic.
//!
//! Polls a [`BaseMessageSource`] and hands each message to the
//! [`EnrichmentProcessor`], one at a time. A message that is being processed
//! when shutdown is requested runs to completion; the loop then closes the
//! source exactly once and returns.
//!
//! ```text
//! ConsumptionLoop
//!     │
//!     ├─► poll (bounded wait, or shutdown)
//!     │       ├─► nothing      → poll again
//!     │       ├─► error        → log, back off, poll again
//!     │       └─► message      → decode key → EnrichmentProcessor::process
//!     └─► shutdown             → close source → return stats
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use super::errors::EnrichmentError;
use super::processor::{EnrichmentProcessor, ProcessOutcome};
use crate::common::InboundMessage;
use crate::kernel::BaseMessageSource;

/// Configuration for the consumption loop.
#[derive(Debug, Clone)]
pub struct ConsumptionLoopConfig {
    /// Upper bound on a single poll, also the back-off after a transport error
    pub poll_timeout: Duration,
    /// Identifies this consumer instance in logs and as the Kafka client id
    pub worker_id: String,
}

impl Default for ConsumptionLoopConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(1),
            worker_id: format!("enricher-{}", Uuid::new_v4()),
        }
    }
}

impl ConsumptionLoopConfig {
    pub fn with_worker_id(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            ..Default::default()
        }
    }

    pub fn poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumptionStats {
    /// Messages handed to the processor (including undecodable keys)
    pub received: usize,
    pub enriched: usize,
    pub skipped: usize,
    /// Failed polls
    pub transport_errors: usize,
}

impl ConsumptionStats {
    fn record(&mut self, outcome: &ProcessOutcome) {
        self.received += 1;
        if outcome.is_enriched() {
            self.enriched += 1;
        } else {
            self.skipped += 1;
        }
    }
}

pub struct ConsumptionLoop<S: BaseMessageSource> {
    source: Arc<S>,
    processor: EnrichmentProcessor,
    config: ConsumptionLoopConfig,
}

impl<S: BaseMessageSource> ConsumptionLoop<S> {
    pub fn new(source: Arc<S>, processor: EnrichmentProcessor) -> Self {
        Self::with_config(source, processor, ConsumptionLoopConfig::default())
    }

    pub fn with_config(
        source: Arc<S>,
        processor: EnrichmentProcessor,
        config: ConsumptionLoopConfig,
    ) -> Self {
        Self {
            source,
            processor,
            config,
        }
    }

    pub fn config(&self) -> &ConsumptionLoopConfig {
        &self.config
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Transport errors never end the loop. Closing the source is attempted
    /// once on the way out; a failure there is logged, not returned.
    pub async fn run(self, shutdown: CancellationToken) -> ConsumptionStats {
        info!(worker_id = %self.config.worker_id, "Starting Kafka consumer");

        let mut stats = ConsumptionStats::default();

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let polled = tokio::select! {
                _ = shutdown.cancelled() => break,
                polled = self.source.poll(self.config.poll_timeout) => polled,
            };

            let message = match polled {
                Ok(Some(message)) => message,
                Ok(None) => continue,
                Err(e) => {
                    stats.transport_errors += 1;
                    error!(error = %e, "Consumer error");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.config.poll_timeout) => {}
                    }
                    continue;
                }
            };

            let outcome = self.dispatch(&message).await;
            stats.record(&outcome);
        }

        info!(worker_id = %self.config.worker_id, "Consumer interrupted, draining");

        if let Err(e) = self.source.close().await {
            error!(error = %e, "Failed to close consumer");
        }

        info!(
            worker_id = %self.config.worker_id,
            received = stats.received,
            enriched = stats.enriched,
            skipped = stats.skipped,
            transport_errors = stats.transport_errors,
            "Kafka consumer closed"
        );

        stats
    }

    async fn dispatch(&self, message: &InboundMessage) -> ProcessOutcome {
        let key = match message.decode_key() {
            Ok(key) => key,
            Err(e) => {
                let err = EnrichmentError::malformed(format!("message key is not valid UTF-8: {}", e));
                error!(
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    error = %err,
                    "Skipping message"
                );
                return ProcessOutcome::Skipped(err);
            }
        };

        info!(
            key = %key,
            partition = message.partition,
            offset = message.offset,
            "Received message"
        );

        self.processor.process(&key, message.payload_bytes()).await
    }
}
