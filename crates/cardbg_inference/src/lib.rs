use std::time::Duration;

pub mod generator;
pub mod models;
pub mod synthesizer;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-fast-generate-001";

/// Settings shared by the text and image backends.
#[derive(Clone)]
pub struct InferenceConfig {
    /// Backend name: `gemini` or `dummy`.
    pub provider: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub request_timeout: Duration,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

pub use generator::ImageGenerator;
pub use models::{create_image_model, create_text_model};
pub use synthesizer::PromptSynthesizer;

pub mod prelude {
    pub use super::InferenceConfig;
    pub use super::models::{create_image_model, create_text_model};
    pub use super::{ImageGenerator, PromptSynthesizer};
    pub use cardbg_core::{Error, GeneratedImage, GeneratedPrompt, Result};
}
