pub mod error;
pub mod models;
pub mod notify;
pub mod scraping;
pub mod stage;
pub mod storage;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{Error, PipelineError, Result};
pub use models::{ImageModel, ImageOutput, ImageRequest, TextModel, TextRequest};
pub use notify::{Notification, NotificationLevel, NotificationSink};
pub use scraping::{ContentExtractor, DocumentParser, FetchedBytes, Fetcher, ParsedDocument};
pub use stage::{PipelineState, Stage};
pub use storage::ProfileStore;
pub use types::{
    CardProfile, CardTier, ExtractionResult, GeneratedImage, GeneratedPrompt, ProfileUpdate,
    PromptRequest, EXTRACTION_PLACEHOLDER, MAX_CONTENT_CHARS,
};

pub mod prelude {
    pub use super::{
        Error, GeneratedImage, GeneratedPrompt, PipelineError, PromptRequest, Result, Stage,
    };
}
