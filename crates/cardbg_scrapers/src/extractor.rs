use std::panic::{self, AssertUnwindSafe};
use lazy_static::lazy_static;
use regex::Regex;
use cardbg_core::{
    ContentExtractor, DocumentParser, ExtractionResult, ParsedDocument, Result, MAX_CONTENT_CHARS,
};
use crate::document::HtmlParser;

lazy_static! {
    static ref HEX_COLOR: Regex =
        Regex::new(r"(?i)#(?:[0-9a-f]{6}|[0-9a-f]{3})\b").expect("hex color pattern is valid");
}

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3"];

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Capped at `MAX_CONTENT_CHARS`.
    pub max_content_chars: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_content_chars: MAX_CONTENT_CHARS,
        }
    }
}

/// Single-pass brand signal extractor.
///
/// Extraction degrades instead of failing: a parser error or panic yields
/// `ExtractionResult::degraded()` and a warning.
pub struct Extractor {
    parser: Box<dyn DocumentParser>,
    max_chars: usize,
}

impl Extractor {
    pub fn new() -> Self {
        Self::with_parser(Box::new(HtmlParser))
    }

    pub fn with_parser(parser: Box<dyn DocumentParser>) -> Self {
        Self {
            parser,
            max_chars: MAX_CONTENT_CHARS,
        }
    }

    pub fn with_config(mut self, config: ExtractorConfig) -> Self {
        self.max_chars = config.max_content_chars.min(MAX_CONTENT_CHARS);
        self
    }

    fn try_extract(&self, html: &str) -> Result<ExtractionResult> {
        let document = self.parser.parse(html)?;
        Ok(self.from_document(document.as_ref()))
    }

    fn from_document(&self, document: &dyn ParsedDocument) -> ExtractionResult {
        let headings = document.elements_by_tags(HEADING_TAGS);
        let paragraphs = document.elements_by_tag("p");

        let combined = headings
            .iter()
            .chain(paragraphs.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");

        ExtractionResult {
            title: document.title().unwrap_or_default(),
            meta_description: document.meta_content("description").unwrap_or_default(),
            keywords: document.meta_content("keywords").unwrap_or_default(),
            accent_color: find_accent_color(&document.style_blocks()),
            truncated_content: truncate_chars(&combined, self.max_chars),
            headings,
            paragraphs,
        }
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentExtractor for Extractor {
    fn extract(&self, html: &str) -> ExtractionResult {
        match panic::catch_unwind(AssertUnwindSafe(|| self.try_extract(html))) {
            Ok(Ok(result)) => {
                tracing::debug!(
                    "🔎 Extracted {} headings, {} paragraphs, {} content chars",
                    result.headings.len(),
                    result.paragraphs.len(),
                    result.truncated_content.chars().count()
                );
                result
            }
            Ok(Err(e)) => {
                tracing::warn!("⚠️ Extraction degraded: {}", e);
                ExtractionResult::degraded()
            }
            Err(_) => {
                tracing::warn!("⚠️ Extraction degraded: parser panicked");
                ExtractionResult::degraded()
            }
        }
    }
}

/// First `#rgb` / `#rrggbb` literal across the given CSS blocks.
pub fn find_accent_color(styles: &[String]) -> Option<String> {
    styles
        .iter()
        .find_map(|css| HEX_COLOR.find(css))
        .map(|m| m.as_str().to_string())
}

/// Hard truncation on character boundaries.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardbg_core::{Error, EXTRACTION_PLACEHOLDER};

    struct FailingParser;

    impl DocumentParser for FailingParser {
        fn parse(&self, _html: &str) -> Result<Box<dyn ParsedDocument>> {
            Err(Error::External(anyhow::anyhow!("unsupported encoding")))
        }
    }

    struct PanickingParser;

    impl DocumentParser for PanickingParser {
        fn parse(&self, _html: &str) -> Result<Box<dyn ParsedDocument>> {
            panic!("tree builder exploded")
        }
    }

    #[test]
    fn test_acme_example() {
        let html = r#"<html><head><title>Acme Corp</title>
            <meta name="description" content="We build widgets"></head>
            <body><h1>Widgets for everyone</h1><p>Since 1920.</p></body></html>"#;
        let result = Extractor::new().extract(html);
        assert_eq!(result.title, "Acme Corp");
        assert_eq!(result.meta_description, "We build widgets");
        assert_eq!(result.truncated_content, "Widgets for everyone Since 1920.");
        assert!(result.truncated_content.chars().count() <= MAX_CONTENT_CHARS);
    }

    #[test]
    fn test_headings_precede_paragraphs() {
        let html = "<p>para one</p><h3>three</h3><p>para two</p><h1>one</h1>";
        let result = Extractor::new().extract(html);
        assert_eq!(result.headings, vec!["three", "one"]);
        assert_eq!(result.paragraphs, vec!["para one", "para two"]);
        assert_eq!(result.truncated_content, "three one para one para two");
    }

    #[test]
    fn test_no_matching_elements_yields_empty_strings() {
        let result = Extractor::new().extract("<div>nothing here</div>");
        assert_eq!(result.title, "");
        assert_eq!(result.meta_description, "");
        assert_eq!(result.truncated_content, "");
        assert_eq!(result.accent_color, None);
        assert!(!result.is_degraded());
    }

    #[test]
    fn test_content_is_truncated_to_budget() {
        let paragraph = "é".repeat(400);
        let html = format!("<p>{0}</p><p>{0}</p><p>{0}</p><p>{0}</p><p>{0}</p>", paragraph);
        let result = Extractor::new().extract(&html);
        assert_eq!(result.truncated_content.chars().count(), MAX_CONTENT_CHARS);
        assert_eq!(result.paragraphs.len(), 5);
    }

    #[test]
    fn test_budget_holds_for_hostile_input() {
        let nested = format!("{}<p>deep</p>{}", "<div>".repeat(2000), "</div>".repeat(2000));
        let garbage: String = (0u8..=255).cycle().take(10_000).map(|b| b as char).collect();
        let long_heading = format!("<h1>{}</h1>", "word ".repeat(2000));

        for html in ["", "\u{0}\u{FFFD}<<<>>>", nested.as_str(), garbage.as_str(), long_heading.as_str()] {
            let result = Extractor::new().extract(html);
            assert!(result.truncated_content.chars().count() <= MAX_CONTENT_CHARS);
        }
    }

    #[test]
    fn test_accent_color_first_literal() {
        let html = r#"<style>.a { border: 1px solid #abcd; }</style>
            <style>.b { color: #FfF; background: #123456; }</style>"#;
        let result = Extractor::new().extract(html);
        assert_eq!(result.accent_color.as_deref(), Some("#FfF"));
    }

    #[test]
    fn test_accent_color_six_digit() {
        let styles = vec!["a{color:#0a0B0c}".to_string()];
        assert_eq!(find_accent_color(&styles).as_deref(), Some("#0a0B0c"));
        assert_eq!(find_accent_color(&["a{color:red}".to_string()]), None);
    }

    #[test]
    fn test_parse_error_degrades_to_placeholder() {
        let result = Extractor::with_parser(Box::new(FailingParser)).extract("<p>x</p>");
        assert!(result.is_degraded());
        assert_eq!(result.truncated_content, EXTRACTION_PLACEHOLDER);
        assert_eq!(result.title, "");
    }

    #[test]
    fn test_parser_panic_degrades_to_placeholder() {
        let result = Extractor::with_parser(Box::new(PanickingParser)).extract("<p>x</p>");
        assert!(result.is_degraded());
    }

    #[test]
    fn test_config_cannot_exceed_budget() {
        let extractor = Extractor::new().with_config(ExtractorConfig { max_content_chars: 10_000 });
        let html = format!("<p>{}</p>", "a".repeat(5000));
        assert_eq!(extractor.extract(&html).truncated_content.len(), MAX_CONTENT_CHARS);

        let extractor = Extractor::new().with_config(ExtractorConfig { max_content_chars: 5 });
        assert_eq!(extractor.extract(&html).truncated_content, "aaaaa");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello");
        assert_eq!(truncate_chars("ñañaña", 3), "ñañ");
    }
}
