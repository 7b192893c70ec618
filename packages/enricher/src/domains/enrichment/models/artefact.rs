use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::rule::ExtractionRule;
use crate::domains::enrichment::errors::EnrichmentError;

/// The only source type this worker enriches.
pub const SOURCE_TYPE_RSS: &str = "RSS";

pub const FIELD_ARTEFACT_ID: &str = "artefact_id";
pub const FIELD_SOURCE_TYPE: &str = "source_type";
pub const FIELD_LOCATOR: &str = "locator";
pub const FIELD_ARTICLE_ELEMENT: &str = "article_element";
pub const FIELD_RAW_CONTENT: &str = "raw_content";

/// An artefact record exactly as it travels on the topic.
///
/// The record is kept as a JSON object so fields this worker does not know
/// about are re-emitted untouched, in their original order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtefactRecord {
    fields: Map<String, Value>,
}

impl ArtefactRecord {
    /// Decode a message payload. Anything but a JSON object is malformed.
    pub fn from_slice(payload: &[u8]) -> Result<Self, EnrichmentError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| EnrichmentError::malformed(format!("payload is not valid JSON: {}", e)))?;

        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(EnrichmentError::malformed(format!(
                "payload must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn raw_content(&self) -> Option<&str> {
        self.fields.get(FIELD_RAW_CONTENT).and_then(Value::as_str)
    }

    /// Check required fields and build the typed request.
    ///
    /// `artefact_id`, `source_type` and `locator` must be non-empty strings and
    /// `article_element` must be a rule with a non-empty `div` entry.
    pub fn validate(&self) -> Result<ArtefactRequest, EnrichmentError> {
        let missing: Vec<&str> = [
            FIELD_ARTEFACT_ID,
            FIELD_SOURCE_TYPE,
            FIELD_ARTICLE_ELEMENT,
            FIELD_LOCATOR,
        ]
        .into_iter()
        .filter(|field| !is_present(self.fields.get(*field)))
        .collect();

        if !missing.is_empty() {
            return Err(EnrichmentError::malformed(format!(
                "missing required attributes: {}",
                missing.join(", ")
            )));
        }

        let artefact_id = self.required_str(FIELD_ARTEFACT_ID)?;
        let source_type = self.required_str(FIELD_SOURCE_TYPE)?;
        let locator = self.required_str(FIELD_LOCATOR)?;

        let rule = self
            .fields
            .get(FIELD_ARTICLE_ELEMENT)
            .map(ExtractionRule::from_json)
            .transpose()?
            .unwrap_or_default();

        if !rule.has_required_tag() {
            return Err(EnrichmentError::malformed(format!(
                "article_element has no {:?} rule",
                ExtractionRule::REQUIRED_TAG
            )));
        }

        Ok(ArtefactRequest {
            artefact_id,
            source_type,
            locator,
            rule,
        })
    }

    /// The republished form of this record: every field kept, `raw_content` set.
    pub fn enriched(&self, raw_content: &str) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(
            FIELD_RAW_CONTENT.to_string(),
            Value::String(raw_content.to_string()),
        );
        Self { fields }
    }

    pub fn to_bytes(&self) -> serde_json::Result<Bytes> {
        serde_json::to_vec(&self.fields).map(Bytes::from)
    }

    fn required_str(&self, field: &str) -> Result<String, EnrichmentError> {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| EnrichmentError::malformed(format!("{} must be a string", field)))
    }
}

/// Validated view of an artefact record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtefactRequest {
    pub artefact_id: String,
    pub source_type: String,
    pub locator: String,
    pub rule: ExtractionRule,
}

impl ArtefactRequest {
    pub fn is_eligible(&self) -> bool {
        self.source_type == SOURCE_TYPE_RSS
    }
}

/// Null, empty strings, empty lists and empty objects count as absent.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Bool(_)) | Some(Value::Number(_)) => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::enrichment::ErrorKind;

    const VALID: &str = r#"{"artefact_id":"abc-123","source_type":"RSS","locator":"http://x","article_element":{"div":["content"]}}"#;

    #[test]
    fn test_validate_valid_record() {
        let record = ArtefactRecord::from_slice(VALID.as_bytes()).unwrap();
        let request = record.validate().unwrap();

        assert_eq!(request.artefact_id, "abc-123");
        assert_eq!(request.locator, "http://x");
        assert!(request.is_eligible());
        assert_eq!(request.rule.candidates_for("div").unwrap(), ["content"]);
    }

    #[test]
    fn test_validate_reports_every_missing_field() {
        let record =
            ArtefactRecord::from_slice(br#"{"artefact_id":"abc","source_type":""}"#).unwrap();
        let err = record.validate().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedMessage);
        let message = err.to_string();
        assert!(message.contains("source_type"));
        assert!(message.contains("article_element"));
        assert!(message.contains("locator"));
        assert!(!message.contains("artefact_id"));
    }

    #[test]
    fn test_validate_requires_div_rule() {
        let record = ArtefactRecord::from_slice(
            br#"{"artefact_id":"abc","source_type":"RSS","locator":"http://x","article_element":{"article":["body"]}}"#,
        )
        .unwrap();
        let err = record.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedMessage);
        assert!(err.to_string().contains("div"));
    }

    #[test]
    fn test_validate_rejects_non_string_id() {
        let record = ArtefactRecord::from_slice(
            br#"{"artefact_id":42,"source_type":"RSS","locator":"http://x","article_element":{"div":["c"]}}"#,
        )
        .unwrap();
        let err = record.validate().unwrap_err();
        assert!(err.to_string().contains("artefact_id must be a string"));
    }

    #[test]
    fn test_from_slice_rejects_non_objects() {
        let err = ArtefactRecord::from_slice(b"[1,2]").unwrap_err();
        assert!(err.to_string().contains("an array"));

        let err = ArtefactRecord::from_slice(b"not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedMessage);
    }

    #[test]
    fn test_non_rss_is_not_eligible() {
        let record = ArtefactRecord::from_slice(
            br#"{"artefact_id":"abc","source_type":"ATOM","locator":"http://x","article_element":{"div":["c"]}}"#,
        )
        .unwrap();
        assert!(!record.validate().unwrap().is_eligible());
    }

    #[test]
    fn test_enriched_keeps_passthrough_fields_in_order() {
        let input = r#"{"title":"T","artefact_id":"abc","source_type":"RSS","locator":"http://x","article_element":{"div":["c"]},"tags":["a","b"]}"#;
        let record = ArtefactRecord::from_slice(input.as_bytes()).unwrap();
        let enriched = record.enriched("Hello");

        let keys: Vec<&str> = enriched.fields().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "title",
                "artefact_id",
                "source_type",
                "locator",
                "article_element",
                "tags",
                "raw_content"
            ]
        );
        for (key, value) in record.fields() {
            assert_eq!(enriched.get(key), Some(value));
        }
        assert_eq!(enriched.raw_content(), Some("Hello"));
        assert_eq!(record.raw_content(), None);
    }
}
