// TestDependencies - mock implementations for testing
//
// Provides call-recording mocks that can be injected into EnricherDeps for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use super::{
    BaseArtefactPublisher, BaseArtefactStore, BaseDocumentFetcher, BaseMessageSource,
    EnricherDeps, FetchError,
};
use crate::common::InboundMessage;

// =============================================================================
// Mock Document Fetcher
// =============================================================================

/// Canned response for a fetch call
#[derive(Debug, Clone)]
pub enum MockFetchResponse {
    Body(String),
    Status(u16),
    EmptyBody,
}

pub struct MockDocumentFetcher {
    responses: Mutex<VecDeque<MockFetchResponse>>,
    calls: Mutex<Vec<String>>,
}

impl MockDocumentFetcher {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue an HTML body to return
    pub fn with_html(self, html: &str) -> Self {
        self.push(MockFetchResponse::Body(html.to_string()));
        self
    }

    /// Queue a non-200 response
    pub fn with_status(self, status: u16) -> Self {
        self.push(MockFetchResponse::Status(status));
        self
    }

    /// Queue a 200 response without a body
    pub fn with_empty_body(self) -> Self {
        self.push(MockFetchResponse::EmptyBody);
        self
    }

    fn push(&self, response: MockFetchResponse) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
    }

    /// Get all URLs that were fetched
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for MockDocumentFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseDocumentFetcher for MockDocumentFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        let next = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match next {
            Some(MockFetchResponse::Body(html)) => Ok(html),
            Some(MockFetchResponse::Status(status)) => Err(FetchError::Status { status }),
            Some(MockFetchResponse::EmptyBody) => Err(FetchError::EmptyBody { status: 200 }),
            None => Err(FetchError::Status { status: 404 }),
        }
    }
}

// =============================================================================
// Mock Artefact Store
// =============================================================================

/// Arguments captured from an update call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCall {
    pub artefact_id: String,
    pub raw_content: String,
}

pub struct MockArtefactStore {
    rows_affected: u64,
    failure: Option<String>,
    calls: Mutex<Vec<UpdateCall>>,
}

impl MockArtefactStore {
    /// A store where every update matches one row
    pub fn new() -> Self {
        Self {
            rows_affected: 1,
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Report this many matched rows for every update
    pub fn with_rows_affected(mut self, rows: u64) -> Self {
        self.rows_affected = rows;
        self
    }

    /// Fail every update with this message
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<UpdateCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for MockArtefactStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseArtefactStore for MockArtefactStore {
    async fn update_raw_content(&self, artefact_id: &str, raw_content: &str) -> Result<u64> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(UpdateCall {
                artefact_id: artefact_id.to_string(),
                raw_content: raw_content.to_string(),
            });

        match &self.failure {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(self.rows_affected),
        }
    }
}

// =============================================================================
// Test Broker (publisher side)
// =============================================================================

/// A published message.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub key: String,
    pub payload: Bytes,
}

impl PublishedMessage {
    /// Deserialize the payload as JSON.
    pub fn json(&self) -> std::result::Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

/// Mock publisher that tracks published messages for testing.
#[derive(Default)]
pub struct TestBroker {
    published: RwLock<Vec<PublishedMessage>>,
    failure: Option<String>,
}

impl TestBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every publish with this message
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Get all published messages.
    pub fn published_messages(&self) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Get published messages for a specific key.
    pub fn messages_for_key(&self, key: &str) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|m| m.key == key)
            .cloned()
            .collect()
    }

    /// Check if any message was published with a key.
    pub fn was_published_with_key(&self, key: &str) -> bool {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|m| m.key == key)
    }

    /// Get the count of published messages.
    pub fn publish_count(&self) -> usize {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait]
impl BaseArtefactPublisher for TestBroker {
    async fn publish(&self, key: String, payload: Bytes) -> Result<()> {
        if let Some(message) = &self.failure {
            return Err(anyhow!("{}", message));
        }

        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(PublishedMessage { key, payload });
        Ok(())
    }
}

// =============================================================================
// Scripted Message Source (consumer side)
// =============================================================================

/// One scripted result of a poll call
#[derive(Debug, Clone)]
pub enum PollEvent {
    Message(InboundMessage),
    Empty,
    Error(String),
}

/// In-memory message source that replays a script of poll results.
///
/// Once the script is exhausted every poll returns `Ok(None)`; if a shutdown
/// token was attached it is cancelled at that point so a loop under test stops.
pub struct ScriptedSource {
    script: Mutex<VecDeque<PollEvent>>,
    shutdown_when_drained: Option<CancellationToken>,
    polls: Mutex<usize>,
    closes: Mutex<usize>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            shutdown_when_drained: None,
            polls: Mutex::new(0),
            closes: Mutex::new(0),
        }
    }

    pub fn with_message(self, message: InboundMessage) -> Self {
        self.push(PollEvent::Message(message));
        self
    }

    pub fn with_empty_poll(self) -> Self {
        self.push(PollEvent::Empty);
        self
    }

    pub fn with_error(self, message: &str) -> Self {
        self.push(PollEvent::Error(message.to_string()));
        self
    }

    /// Cancel `token` once every scripted event has been delivered
    pub fn shutdown_when_drained(mut self, token: CancellationToken) -> Self {
        self.shutdown_when_drained = Some(token);
        self
    }

    fn push(&self, event: PollEvent) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(event);
    }

    pub fn poll_count(&self) -> usize {
        *self.polls.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn close_count(&self) -> usize {
        *self.closes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseMessageSource for ScriptedSource {
    async fn poll(&self, _timeout: Duration) -> Result<Option<InboundMessage>> {
        *self.polls.lock().unwrap_or_else(|e| e.into_inner()) += 1;

        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match next {
            Some(PollEvent::Message(message)) => Ok(Some(message)),
            Some(PollEvent::Empty) => Ok(None),
            Some(PollEvent::Error(message)) => Err(anyhow!("{}", message)),
            None => {
                if let Some(token) = &self.shutdown_when_drained {
                    token.cancel();
                }
                Ok(None)
            }
        }
    }

    async fn close(&self) -> Result<()> {
        *self.closes.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub fetcher: Arc<MockDocumentFetcher>,
    pub store: Arc<MockArtefactStore>,
    pub broker: Arc<TestBroker>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            fetcher: Arc::new(MockDocumentFetcher::new()),
            store: Arc::new(MockArtefactStore::new()),
            broker: Arc::new(TestBroker::new()),
        }
    }

    /// Set a mock fetcher
    pub fn mock_fetcher(mut self, fetcher: MockDocumentFetcher) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    /// Set a mock store
    pub fn mock_store(mut self, store: MockArtefactStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    /// Set a mock broker
    pub fn mock_broker(mut self, broker: TestBroker) -> Self {
        self.broker = Arc::new(broker);
        self
    }

    /// Convert into EnricherDeps for a processor under test
    pub fn to_deps(&self) -> EnricherDeps {
        EnricherDeps::new(self.fetcher.clone(), self.store.clone(), self.broker.clone())
    }

    /// Total number of side-effecting calls made so far
    pub fn side_effect_count(&self) -> usize {
        self.fetcher.call_count() + self.store.call_count() + self.broker.publish_count()
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broker_records_messages() {
        let broker = TestBroker::new();

        broker
            .publish("abc-scraped".to_string(), Bytes::from(r#"{"id":"abc"}"#))
            .await
            .unwrap();

        assert_eq!(broker.publish_count(), 1);
        assert!(broker.was_published_with_key("abc-scraped"));
        assert!(!broker.was_published_with_key("abc"));
        assert_eq!(
            broker.messages_for_key("abc-scraped")[0].json().unwrap()["id"],
            "abc"
        );
    }

    #[tokio::test]
    async fn test_failing_broker_records_nothing() {
        let broker = TestBroker::new().failing("broker down");

        let err = broker
            .publish("abc-scraped".to_string(), Bytes::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "broker down");
        assert_eq!(broker.publish_count(), 0);
    }

    #[tokio::test]
    async fn test_scripted_source_cancels_when_drained() {
        let token = CancellationToken::new();
        let source = ScriptedSource::new()
            .with_empty_poll()
            .shutdown_when_drained(token.clone());

        assert!(source.poll(Duration::ZERO).await.unwrap().is_none());
        assert!(!token.is_cancelled());
        assert!(source.poll(Duration::ZERO).await.unwrap().is_none());
        assert!(token.is_cancelled());
        assert_eq!(source.poll_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_fetcher_defaults_to_not_found() {
        let fetcher = MockDocumentFetcher::new().with_html("<p>hi</p>");

        assert_eq!(fetcher.fetch("http://a").await.unwrap(), "<p>hi</p>");
        let err = fetcher.fetch("http://b").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(fetcher.calls(), vec!["http://a", "http://b"]);
    }
}
