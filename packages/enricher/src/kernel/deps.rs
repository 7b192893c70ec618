//! Enricher dependencies (using traits for testability)
//!
//! Long-lived handles are opened once by the binary and shared by reference
//! with the processor; tests swap in the mocks from `test_dependencies`.

use std::sync::Arc;

use crate::kernel::{BaseArtefactPublisher, BaseArtefactStore, BaseDocumentFetcher};

/// Dependencies of the enrichment processor.
#[derive(Clone)]
pub struct EnricherDeps {
    pub fetcher: Arc<dyn BaseDocumentFetcher>,
    pub store: Arc<dyn BaseArtefactStore>,
    pub publisher: Arc<dyn BaseArtefactPublisher>,
}

impl EnricherDeps {
    pub fn new(
        fetcher: Arc<dyn BaseDocumentFetcher>,
        store: Arc<dyn BaseArtefactStore>,
        publisher: Arc<dyn BaseArtefactPublisher>,
    ) -> Self {
        Self {
            fetcher,
            store,
            publisher,
        }
    }
}
