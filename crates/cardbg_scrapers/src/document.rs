use scraper::{ElementRef, Html, Selector};
use cardbg_core::{DocumentParser, ParsedDocument, Result};

/// html5ever-backed document. Parsing never runs scripts or loads
/// sub-resources.
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    fn select_all(&self, selector: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(selector) {
            Ok(selector) => self.html.select(&selector).collect(),
            Err(e) => {
                tracing::debug!("Invalid selector {:?}: {:?}", selector, e);
                Vec::new()
            }
        }
    }
}

impl ParsedDocument for HtmlDocument {
    fn title(&self) -> Option<String> {
        self.select_all("title")
            .into_iter()
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty())
    }

    fn meta_content(&self, name: &str) -> Option<String> {
        self.select_all("meta[name]")
            .into_iter()
            .find(|el| {
                el.value()
                    .attr("name")
                    .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
            })
            .and_then(|el| el.value().attr("content"))
            .map(|content| content.trim().to_string())
    }

    fn elements_by_tags(&self, tags: &[&str]) -> Vec<String> {
        let tags: Vec<&str> = tags
            .iter()
            .copied()
            .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_alphanumeric()))
            .collect();
        if tags.is_empty() {
            return Vec::new();
        }

        self.select_all(&tags.join(", "))
            .into_iter()
            .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
            .filter(|text| !text.is_empty())
            .collect()
    }

    fn style_blocks(&self) -> Vec<String> {
        self.select_all("style")
            .into_iter()
            .map(|el| el.text().collect::<String>())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl DocumentParser for HtmlParser {
    fn parse(&self, html: &str) -> Result<Box<dyn ParsedDocument>> {
        Ok(Box::new(HtmlDocument::parse(html)))
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
          <head>
            <title>  Acme
              Corp </title>
            <meta name="Description" content=" We build widgets ">
            <meta name="keywords" content="widgets, gears">
            <style>body { color: #1A2b3C; }</style>
          </head>
          <body>
            <h2>Second level</h2>
            <p>First <b>bold</b> paragraph</p>
            <h1>Top level</h1>
            <script>document.write("<p>injected</p>")</script>
          </body>
        </html>
    "#;

    #[test]
    fn test_title_and_meta() {
        let doc = HtmlDocument::parse(PAGE);
        assert_eq!(doc.title().as_deref(), Some("Acme Corp"));
        assert_eq!(doc.meta_content("description").as_deref(), Some("We build widgets"));
        assert_eq!(doc.meta_content("keywords").as_deref(), Some("widgets, gears"));
        assert_eq!(doc.meta_content("author"), None);
    }

    #[test]
    fn test_elements_keep_document_order() {
        let doc = HtmlDocument::parse(PAGE);
        assert_eq!(doc.elements_by_tags(&["h1", "h2", "h3"]), vec!["Second level", "Top level"]);
        assert_eq!(doc.elements_by_tag("p"), vec!["First bold paragraph"]);
    }

    #[test]
    fn test_scripts_are_not_executed() {
        let doc = HtmlDocument::parse(PAGE);
        assert!(!doc.elements_by_tag("p").iter().any(|p| p.contains("injected")));
    }

    #[test]
    fn test_rejects_selector_injection() {
        let doc = HtmlDocument::parse(PAGE);
        assert!(doc.elements_by_tag("p, title").is_empty());
    }

    #[test]
    fn test_style_blocks() {
        let doc = HtmlDocument::parse(PAGE);
        assert_eq!(doc.style_blocks(), vec!["body { color: #1A2b3C; }"]);
    }
}
