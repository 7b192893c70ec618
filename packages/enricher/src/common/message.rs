//! Broker message envelope and key conventions.
//!
//! A message key is the artefact id of the record it carries. Once an artefact
//! has been enriched, the record is republished under the same id with
//! [`PROCESSED_MARKER`] appended, and that suffix is the only signal telling
//! later deliveries apart from pending work.

/// Key suffix marking an artefact that has already been enriched.
pub const PROCESSED_MARKER: &str = "-scraped";

/// Key used when a delivered message carries no key at all.
pub const MISSING_KEY: &str = "No Key";

/// A message delivered by a [`BaseMessageSource`](crate::kernel::BaseMessageSource).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundMessage {
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl InboundMessage {
    /// Create a keyed message with a payload (topic/partition/offset left empty).
    pub fn new(key: impl Into<Vec<u8>>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            key: Some(key.into()),
            payload: Some(payload.into()),
            ..Default::default()
        }
    }

    /// Set the broker coordinates of this message.
    pub fn at(mut self, topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        self.topic = topic.into();
        self.partition = partition;
        self.offset = offset;
        self
    }

    /// Decode the key as UTF-8, falling back to [`MISSING_KEY`] when absent.
    pub fn decode_key(&self) -> Result<String, std::str::Utf8Error> {
        match &self.key {
            Some(bytes) => std::str::from_utf8(bytes).map(str::to_owned),
            None => Ok(MISSING_KEY.to_string()),
        }
    }

    /// Payload bytes, empty for tombstones.
    pub fn payload_bytes(&self) -> &[u8] {
        self.payload.as_deref().unwrap_or_default()
    }
}

/// Whether a message key denotes an already-enriched artefact.
pub fn is_processed_key(key: &str) -> bool {
    key.ends_with(PROCESSED_MARKER)
}

/// The key an enriched artefact is republished under.
pub fn processed_key(artefact_id: &str) -> String {
    format!("{}{}", artefact_id, PROCESSED_MARKER)
}
