//! Enrichment processor - one message in, at most one enriched message out.
//!
//! Stages run in order and stop at the first failure:
//!
//! 1. idempotency gate (processed-marker on the key)
//! 2. validation gate (required fields, `div` rule)
//! 3. eligibility gate (`source_type == "RSS"`)
//! 4. fetch the locator
//! 5. extract the fragment
//! 6. persist `raw_content`
//! 7. republish under the processed key
//!
//! Nothing is retried and no error leaves [`EnrichmentProcessor::process`];
//! every failure ends up as a logged [`ProcessOutcome::Skipped`].

use anyhow::anyhow;
use scraper::Html;
use tracing::{error, info, warn};

use super::errors::{EnrichmentError, ErrorKind};
use super::extraction::extract_fragment;
use super::models::{ArtefactRecord, ArtefactRequest};
use crate::common::{is_processed_key, processed_key};
use crate::kernel::EnricherDeps;

/// What happened to a single message.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Stored and republished. `rows_affected` is 0 when the store had no row
    /// for the artefact; the enriched record is republished anyway.
    Enriched {
        artefact_id: String,
        rows_affected: u64,
    },
    Skipped(EnrichmentError),
}

impl ProcessOutcome {
    pub fn is_enriched(&self) -> bool {
        matches!(self, ProcessOutcome::Enriched { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ProcessOutcome::Enriched { .. } => None,
            ProcessOutcome::Skipped(e) => Some(e.kind()),
        }
    }
}

pub struct EnrichmentProcessor {
    deps: EnricherDeps,
}

impl EnrichmentProcessor {
    pub fn new(deps: EnricherDeps) -> Self {
        Self { deps }
    }

    /// Run one message through every stage. Never fails.
    pub async fn process(&self, key: &str, payload: &[u8]) -> ProcessOutcome {
        match self.try_process(key, payload).await {
            Ok((artefact_id, rows_affected)) => {
                info!(
                    artefact_id = %artefact_id,
                    rows_affected = rows_affected,
                    "Successfully processed and updated artefact"
                );
                ProcessOutcome::Enriched {
                    artefact_id,
                    rows_affected,
                }
            }
            Err(e) => {
                log_skip(key, &e);
                ProcessOutcome::Skipped(e)
            }
        }
    }

    async fn try_process(&self, key: &str, payload: &[u8]) -> Result<(String, u64), EnrichmentError> {
        if is_processed_key(key) {
            return Err(EnrichmentError::AlreadyProcessed {
                key: key.to_string(),
            });
        }

        let record = ArtefactRecord::from_slice(payload)?;
        let request = record.validate()?;

        if !request.is_eligible() {
            return Err(EnrichmentError::NotApplicable {
                artefact_id: request.artefact_id,
                source_type: request.source_type,
            });
        }

        let html = self
            .deps
            .fetcher
            .fetch(&request.locator)
            .await
            .map_err(|source| EnrichmentError::FetchFailed {
                artefact_id: request.artefact_id.clone(),
                source,
            })?;

        let text = extract(&html, &request)?;

        let rows_affected = self.persist(&request, &text).await?;
        self.republish(&record, &request, &text).await?;

        Ok((request.artefact_id, rows_affected))
    }

    async fn persist(&self, request: &ArtefactRequest, text: &str) -> Result<u64, EnrichmentError> {
        let rows_affected = self
            .deps
            .store
            .update_raw_content(&request.artefact_id, text)
            .await
            .map_err(|source| EnrichmentError::PersistenceFailed {
                artefact_id: request.artefact_id.clone(),
                source,
            })?;

        if rows_affected > 0 {
            info!(
                artefact_id = %request.artefact_id,
                rows_affected = rows_affected,
                "Updated raw content"
            );
        } else {
            warn!(
                artefact_id = %request.artefact_id,
                "No rows updated, check that the artefact exists; republishing anyway"
            );
        }

        Ok(rows_affected)
    }

    async fn republish(
        &self,
        record: &ArtefactRecord,
        request: &ArtefactRequest,
        text: &str,
    ) -> Result<(), EnrichmentError> {
        let payload =
            record
                .enriched(text)
                .to_bytes()
                .map_err(|e| EnrichmentError::Unexpected {
                    artefact_id: request.artefact_id.clone(),
                    source: anyhow!(e).context("Failed to serialize enriched artefact"),
                })?;

        let key = processed_key(&request.artefact_id);
        self.deps
            .publisher
            .publish(key.clone(), payload)
            .await
            .map_err(|source| EnrichmentError::TransportError {
                artefact_id: Some(request.artefact_id.clone()),
                context: format!("publish {}", key),
                source,
            })
    }
}

/// Parse and extract synchronously; the parsed document never lives across an await.
fn extract(html: &str, request: &ArtefactRequest) -> Result<String, EnrichmentError> {
    let document = Html::parse_document(html);
    extract_fragment(&document, &request.rule, &request.artefact_id)
}

fn log_skip(key: &str, e: &EnrichmentError) {
    let artefact_id = e.artefact_id().unwrap_or("unknown");

    match e.kind() {
        ErrorKind::NotApplicable => {
            info!(key = %key, artefact_id = %artefact_id, reason = %e, "Ignoring message");
        }
        ErrorKind::FetchFailed => {
            warn!(
                artefact_id = %artefact_id,
                status = ?e.http_status(),
                error = %e,
                "Failed to fetch HTML"
            );
        }
        ErrorKind::ExtractionNotFound => {
            warn!(artefact_id = %artefact_id, error = %e, "No extraction rule matched");
        }
        ErrorKind::MalformedMessage => {
            error!(key = %key, error = %e, "Message missing required attributes or article_element is invalid");
        }
        ErrorKind::PersistenceFailed | ErrorKind::TransportError | ErrorKind::Unexpected => {
            error!(
                artefact_id = %artefact_id,
                kind = e.kind().as_str(),
                error = ?e,
                "Error processing message"
            );
        }
    }
}
