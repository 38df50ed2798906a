pub mod document;
pub mod extractor;
pub mod fetcher;

pub use document::{HtmlDocument, HtmlParser};
pub use extractor::{Extractor, ExtractorConfig};
pub use fetcher::{is_public_host, normalize_url, FetcherConfig, HttpFetcher};

pub mod prelude {
    pub use super::{Extractor, HttpFetcher};
    pub use cardbg_core::{ContentExtractor, ExtractionResult, Fetcher, Result, Error};
}
