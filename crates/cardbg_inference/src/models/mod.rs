use std::sync::Arc;
use cardbg_core::{Error, ImageModel, Result, TextModel};
use crate::InferenceConfig;

pub mod dummy;
pub mod gemini;

pub use dummy::{DummyImageModel, DummyTextModel};
pub use gemini::{GeminiTextModel, ImagenModel};

pub const AVAILABLE_PROVIDERS: &[&str] = &["gemini", "dummy"];

pub fn create_text_model(config: &InferenceConfig) -> Result<Arc<dyn TextModel>> {
    match config.provider.to_lowercase().as_str() {
        "gemini" => Ok(Arc::new(GeminiTextModel::new(config)?)),
        "dummy" => Ok(Arc::new(DummyTextModel)),
        other => Err(unknown_provider(other)),
    }
}

pub fn create_image_model(config: &InferenceConfig) -> Result<Arc<dyn ImageModel>> {
    match config.provider.to_lowercase().as_str() {
        "gemini" => Ok(Arc::new(ImagenModel::new(config)?)),
        "dummy" => Ok(Arc::new(DummyImageModel)),
        other => Err(unknown_provider(other)),
    }
}

fn unknown_provider(name: &str) -> Error {
    Error::Validation(format!(
        "Unknown model provider: {}. Available providers: {}",
        name,
        AVAILABLE_PROVIDERS.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_models_by_provider() {
        let config = InferenceConfig {
            provider: "dummy".to_string(),
            ..InferenceConfig::default()
        };
        assert_eq!(create_text_model(&config).unwrap().name(), "Dummy");
        assert_eq!(create_image_model(&config).unwrap().name(), "Dummy");

        let config = InferenceConfig {
            provider: "Gemini".to_string(),
            api_key: Some("key".to_string()),
            ..InferenceConfig::default()
        };
        assert_eq!(create_text_model(&config).unwrap().name(), "Gemini");
        assert_eq!(create_image_model(&config).unwrap().name(), "Imagen");
    }

    #[test]
    fn test_unknown_provider() {
        let config = InferenceConfig {
            provider: "ollama".to_string(),
            ..InferenceConfig::default()
        };
        let err = create_text_model(&config).unwrap_err();
        assert!(err.to_string().contains("Unknown model provider: ollama"));
    }
}
