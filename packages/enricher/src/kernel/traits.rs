// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// The enrichment flow itself lives in domains/enrichment and uses these traits.
//
// Naming convention: Base* for trait names (e.g., BaseDocumentFetcher)

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use super::fetcher::FetchError;
use crate::common::InboundMessage;

// =============================================================================
// Document Fetcher Trait (Infrastructure - outbound HTTP)
// =============================================================================

#[async_trait]
pub trait BaseDocumentFetcher: Send + Sync {
    /// GET a document and return its body.
    ///
    /// Anything but HTTP 200 with a non-empty body is a `FetchError`.
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError>;
}

// =============================================================================
// Artefact Store Trait (Infrastructure - durable store)
// =============================================================================

#[async_trait]
pub trait BaseArtefactStore: Send + Sync {
    /// Set the raw content of an artefact in a committed transaction.
    /// Returns the number of rows matched.
    async fn update_raw_content(&self, artefact_id: &str, raw_content: &str) -> Result<u64>;
}

// =============================================================================
// Artefact Publisher Trait (Infrastructure - broker producer)
// =============================================================================

#[async_trait]
pub trait BaseArtefactPublisher: Send + Sync {
    /// Publish a keyed message and wait until the broker acknowledged it.
    async fn publish(&self, key: String, payload: Bytes) -> Result<()>;
}

// =============================================================================
// Message Source Trait (Infrastructure - broker consumer)
// =============================================================================

#[async_trait]
pub trait BaseMessageSource: Send + Sync {
    /// Wait up to `timeout` for the next message.
    ///
    /// `Ok(None)` means nothing arrived in time; `Err` is a transport error.
    async fn poll(&self, timeout: Duration) -> Result<Option<InboundMessage>>;

    /// Leave the consumer group and release the consumer.
    async fn close(&self) -> Result<()>;
}
