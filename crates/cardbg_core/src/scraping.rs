use async_trait::async_trait;
use url::Url;
use crate::types::ExtractionResult;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBytes {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the body of an HTML page. Non-2xx statuses are errors.
    async fn fetch_html(&self, url: &Url) -> Result<String>;

    /// Fetches a binary resource along with its declared content type.
    async fn fetch_bytes(&self, url: &Url) -> Result<FetchedBytes>;
}

/// Read-only view over a parsed HTML document.
pub trait ParsedDocument {
    fn title(&self) -> Option<String>;

    /// `content` attribute of the first `<meta name="{name}">`.
    fn meta_content(&self, name: &str) -> Option<String>;

    /// Text of every element whose tag is in `tags`, in document order.
    fn elements_by_tags(&self, tags: &[&str]) -> Vec<String>;

    fn elements_by_tag(&self, tag: &str) -> Vec<String> {
        self.elements_by_tags(&[tag])
    }

    /// Raw CSS of inline `<style>` blocks.
    fn style_blocks(&self) -> Vec<String> {
        self.elements_by_tag("style")
    }
}

pub trait DocumentParser: Send + Sync {
    fn parse(&self, html: &str) -> Result<Box<dyn ParsedDocument>>;
}

/// Turns raw HTML into an `ExtractionResult`. Infallible by contract.
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, html: &str) -> ExtractionResult;
}
