use std::fmt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;
use crate::Result;

/// One text-generation call: a fixed instruction plus the structured input
/// it operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRequest {
    pub instruction: String,
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    pub model_id: String,
    pub prompt: String,
}

/// What an image model hands back before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutput {
    /// A complete `data:` URI.
    Embedded(String),
    /// A reference that still has to be downloaded.
    Remote(Url),
}

#[async_trait]
pub trait TextModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Returns the raw model reply. An empty string is a valid reply here;
    /// deciding whether it is usable is the caller's job.
    async fn generate(&self, request: &TextRequest) -> Result<String>;
}

#[async_trait]
pub trait ImageModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Returns the first image the model produced.
    async fn generate(&self, request: &ImageRequest) -> Result<ImageOutput>;
}
