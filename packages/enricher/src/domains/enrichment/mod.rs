//! Enrichment domain - turns raw artefacts into scraped artefacts.
//!
//! ```text
//! ConsumptionLoop
//!     │
//!     ├─► poll BaseMessageSource (bounded wait)
//!     ├─► decode key
//!     └─► EnrichmentProcessor::process(key, payload)
//!             ├─► idempotency / validation / eligibility gates
//!             ├─► BaseDocumentFetcher::fetch(locator)
//!             ├─► extract_fragment(document, rule)
//!             ├─► BaseArtefactStore::update_raw_content
//!             └─► BaseArtefactPublisher::publish("{artefact_id}-scraped")
//! ```

pub mod consumer;
pub mod errors;
pub mod extraction;
pub mod models;
pub mod processor;

pub use consumer::{ConsumptionLoop, ConsumptionLoopConfig, ConsumptionStats};
pub use errors::{EnrichmentError, ErrorKind};
pub use extraction::extract_fragment;
pub use models::{ArtefactRecord, ArtefactRequest, ExtractionRule, RuleEntry, SOURCE_TYPE_RSS};
pub use processor::{EnrichmentProcessor, ProcessOutcome};
