use serde_json::Value;

use crate::domains::enrichment::errors::EnrichmentError;

/// One tag of an extraction rule with its class candidates, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEntry {
    pub tag: String,
    pub candidates: Vec<String>,
}

impl RuleEntry {
    pub fn new<I, S>(tag: impl Into<String>, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tag: tag.into(),
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered extraction rule: tags are tried in declaration order, and within a
/// tag the class candidates are tried in list order.
///
/// Parsed from the `article_element` object of an artefact record, e.g.
/// `{"div": ["teaser", "body"], "article": ["main"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionRule {
    entries: Vec<RuleEntry>,
}

impl ExtractionRule {
    /// Every rule must target at least this tag.
    pub const REQUIRED_TAG: &'static str = "div";

    /// Append a tag with its candidates.
    pub fn with<I, S>(mut self, tag: impl Into<String>, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.push(RuleEntry::new(tag, candidates));
        self
    }

    /// Parse a rule from its JSON form, keeping the object's key order.
    ///
    /// The value must be an object whose values are arrays of strings.
    pub fn from_json(value: &Value) -> Result<Self, EnrichmentError> {
        let object = value
            .as_object()
            .ok_or_else(|| EnrichmentError::malformed("article_element must be an object"))?;

        let mut entries = Vec::with_capacity(object.len());
        for (tag, candidates) in object {
            let list = candidates.as_array().ok_or_else(|| {
                EnrichmentError::malformed(format!(
                    "article_element.{} must be a list of class names",
                    tag
                ))
            })?;

            let candidates = list
                .iter()
                .map(|candidate| {
                    candidate.as_str().map(str::to_owned).ok_or_else(|| {
                        EnrichmentError::malformed(format!(
                            "article_element.{} must only contain strings",
                            tag
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            entries.push(RuleEntry {
                tag: tag.clone(),
                candidates,
            });
        }

        Ok(Self { entries })
    }

    /// Candidates declared for a tag.
    pub fn candidates_for(&self, tag: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|entry| entry.tag == tag)
            .map(|entry| entry.candidates.as_slice())
    }

    /// Whether the rule has a non-empty `div` entry.
    pub fn has_required_tag(&self) -> bool {
        self.candidates_for(Self::REQUIRED_TAG)
            .is_some_and(|candidates| !candidates.is_empty())
    }

    /// All `(tag, class)` pairs in the order they must be tried.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|entry| {
            entry
                .candidates
                .iter()
                .map(move |candidate| (entry.tag.as_str(), candidate.as_str()))
        })
    }
}
