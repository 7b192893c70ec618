//! Rule-driven text extraction over a parsed HTML document.

use scraper::{ElementRef, Html};

use super::errors::EnrichmentError;
use super::models::ExtractionRule;

/// Return the text of the first element matching the rule.
///
/// Pairs are tried in rule order (tags in declaration order, candidates in
/// list order); for each pair the first element in document order whose tag
/// is `tag` and whose class list contains `class` wins. Elements with no text
/// are passed over.
///
/// Each text node is trimmed on its own and the non-empty pieces are joined
/// without a separator.
pub fn extract_fragment(
    document: &Html,
    rule: &ExtractionRule,
    artefact_id: &str,
) -> Result<String, EnrichmentError> {
    for (tag, class) in rule.pairs() {
        let found = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|element| element_matches(element, tag, class))
            .map(|element| stripped_text(&element))
            .find(|text| !text.is_empty());

        if let Some(text) = found {
            return Ok(text);
        }
    }

    Err(EnrichmentError::ExtractionNotFound {
        artefact_id: artefact_id.to_string(),
    })
}

fn stripped_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}

fn element_matches(element: &ElementRef<'_>, tag: &str, class: &str) -> bool {
    let value = element.value();
    if !value.name().eq_ignore_ascii_case(tag) {
        return false;
    }

    // A candidate with spaces names the whole class attribute.
    if class.contains(char::is_whitespace) {
        return value.attr("class").is_some_and(|attr| attr.trim() == class.trim());
    }

    value.classes().any(|c| c == class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::enrichment::ErrorKind;

    fn extract(html: &str, rule: &ExtractionRule) -> Result<String, EnrichmentError> {
        extract_fragment(&Html::parse_document(html), rule, "artefact-1")
    }

    #[test]
    fn test_second_candidate_used_when_first_absent() {
        let rule = ExtractionRule::default().with("div", ["teaser", "body"]);
        let text = extract(r#"<html><body><div class="body">X</div></body></html>"#, &rule).unwrap();
        assert_eq!(text, "X");
    }

    #[test]
    fn test_candidate_order_beats_document_order() {
        let html = r#"
            <div class="body">Body text</div>
            <div class="teaser">Teaser text</div>
        "#;
        let rule = ExtractionRule::default().with("div", ["teaser", "body"]);
        assert_eq!(extract(html, &rule).unwrap(), "Teaser text");
    }

    #[test]
    fn test_tag_order_is_respected() {
        let html = r#"
            <div class="content">From div</div>
            <article class="content">From article</article>
        "#;
        let rule = ExtractionRule::default()
            .with("article", ["content"])
            .with("div", ["content"]);
        assert_eq!(extract(html, &rule).unwrap(), "From article");
    }

    #[test]
    fn test_tag_must_match() {
        let html = r#"<section class="content">Wrong tag</section>"#;
        let rule = ExtractionRule::default().with("div", ["content"]);
        let err = extract(html, &rule).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExtractionNotFound);
        assert_eq!(err.artefact_id(), Some("artefact-1"));
    }

    #[test]
    fn test_matches_one_of_several_classes() {
        let html = r#"<div class="post content wide">  Hello  </div>"#;
        let rule = ExtractionRule::default().with("div", ["content"]);
        assert_eq!(extract(html, &rule).unwrap(), "Hello");
    }

    #[test]
    fn test_class_substring_does_not_match() {
        let html = r#"<div class="content-wrapper">Nope</div>"#;
        let rule = ExtractionRule::default().with("div", ["content"]);
        assert!(extract(html, &rule).is_err());
    }

    #[test]
    fn test_multi_class_candidate_matches_full_attribute() {
        let html = r#"<div class="article body">Full</div><div class="body">Partial</div>"#;
        let rule = ExtractionRule::default().with("div", ["article body"]);
        assert_eq!(extract(html, &rule).unwrap(), "Full");
    }

    #[test]
    fn test_nested_text_nodes_are_stripped_and_joined() {
        let html = "<div class=\"content\">\n  <p>Hello</p>\n  <p>World</p>\n</div>";
        let rule = ExtractionRule::default().with("div", ["content"]);
        assert_eq!(extract(html, &rule).unwrap(), "HelloWorld");
    }

    #[test]
    fn test_inline_markup_pieces_are_joined_without_spaces() {
        let rule = ExtractionRule::default().with("div", ["content"]);

        let html = r#"<div class="content"> Breaking <b>news</b> today </div>"#;
        assert_eq!(extract(html, &rule).unwrap(), "Breakingnewstoday");

        let html = r#"<div class="content">  Hello big world  </div>"#;
        assert_eq!(extract(html, &rule).unwrap(), "Hello big world");
    }

    #[test]
    fn test_empty_match_falls_through() {
        let html = r#"<div class="teaser">   </div><div class="body">Body</div>"#;
        let rule = ExtractionRule::default().with("div", ["teaser", "body"]);
        assert_eq!(extract(html, &rule).unwrap(), "Body");
    }

    #[test]
    fn test_no_match_fails() {
        let rule = ExtractionRule::default().with("div", ["content"]);
        let err = extract("<p>nothing here</p>", &rule).unwrap_err();
        assert!(matches!(err, EnrichmentError::ExtractionNotFound { .. }));
    }
}
