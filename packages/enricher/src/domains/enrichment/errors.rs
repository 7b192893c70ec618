use thiserror::Error;

use crate::kernel::FetchError;

/// Outcome classes for a message that was not enriched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedMessage,
    NotApplicable,
    FetchFailed,
    ExtractionNotFound,
    PersistenceFailed,
    TransportError,
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedMessage => "malformed_message",
            ErrorKind::NotApplicable => "not_applicable",
            ErrorKind::FetchFailed => "fetch_failed",
            ErrorKind::ExtractionNotFound => "extraction_not_found",
            ErrorKind::PersistenceFailed => "persistence_failed",
            ErrorKind::TransportError => "transport_error",
            ErrorKind::Unexpected => "unexpected_error",
        }
    }
}

/// Why a single message was abandoned.
///
/// Every stage of [`EnrichmentProcessor`](super::EnrichmentProcessor) returns
/// this error; none of them escape the processor.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("malformed message: {reason}")]
    MalformedMessage { reason: String },

    #[error("already processed message with key {key}")]
    AlreadyProcessed { key: String },

    #[error("artefact {artefact_id}: source type {source_type:?} is not eligible for enrichment")]
    NotApplicable {
        artefact_id: String,
        source_type: String,
    },

    #[error("failed to fetch HTML for artefact {artefact_id}: {source}")]
    FetchFailed {
        artefact_id: String,
        #[source]
        source: FetchError,
    },

    #[error("text not found for artefact {artefact_id} in the specified elements")]
    ExtractionNotFound { artefact_id: String },

    #[error("failed to store raw content for artefact {artefact_id}: {source}")]
    PersistenceFailed {
        artefact_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("transport error ({context}): {source}")]
    TransportError {
        artefact_id: Option<String>,
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("unexpected error for artefact {artefact_id}: {source}")]
    Unexpected {
        artefact_id: String,
        #[source]
        source: anyhow::Error,
    },
}

impl EnrichmentError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedMessage { .. } => ErrorKind::MalformedMessage,
            Self::AlreadyProcessed { .. } | Self::NotApplicable { .. } => ErrorKind::NotApplicable,
            Self::FetchFailed { .. } => ErrorKind::FetchFailed,
            Self::ExtractionNotFound { .. } => ErrorKind::ExtractionNotFound,
            Self::PersistenceFailed { .. } => ErrorKind::PersistenceFailed,
            Self::TransportError { .. } => ErrorKind::TransportError,
            Self::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    /// The artefact this error concerns, if it got far enough to know one.
    pub fn artefact_id(&self) -> Option<&str> {
        match self {
            Self::NotApplicable { artefact_id, .. }
            | Self::FetchFailed { artefact_id, .. }
            | Self::ExtractionNotFound { artefact_id }
            | Self::PersistenceFailed { artefact_id, .. }
            | Self::Unexpected { artefact_id, .. } => Some(artefact_id),
            Self::TransportError { artefact_id, .. } => artefact_id.as_deref(),
            Self::MalformedMessage { .. } | Self::AlreadyProcessed { .. } => None,
        }
    }

    /// HTTP status of a failed fetch, when the server answered at all.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::FetchFailed { source, .. } => source.status(),
            _ => None,
        }
    }
}
