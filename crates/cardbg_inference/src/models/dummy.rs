use std::fmt;
use cardbg_core::{ImageModel, ImageOutput, ImageRequest, Result, TextModel, TextRequest};

/// 1×1 PNG in the neutral card color.
const PLACEHOLDER_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Offline text model. Picks up an accent color from the input when one is
/// present so runs against different sites stay distinguishable.
pub struct DummyTextModel;

impl fmt::Debug for DummyTextModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyTextModel").finish()
    }
}

#[async_trait::async_trait]
impl TextModel for DummyTextModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn generate(&self, request: &TextRequest) -> Result<String> {
        let color = request
            .input
            .lines()
            .find_map(|line| line.strip_prefix("Accent color: "))
            .map(str::trim)
            .filter(|c| c.starts_with('#'));

        Ok(match color {
            Some(color) => format!(
                "A soft abstract gradient built around {} with gentle flowing curves and generous empty space.",
                color
            ),
            None => "A soft abstract gradient in muted neutral tones with gentle flowing curves and generous empty space.".to_string(),
        })
    }
}

/// Offline image model returning an embedded placeholder.
pub struct DummyImageModel;

impl fmt::Debug for DummyImageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyImageModel").finish()
    }
}

#[async_trait::async_trait]
impl ImageModel for DummyImageModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn generate(&self, _request: &ImageRequest) -> Result<ImageOutput> {
        Ok(ImageOutput::Embedded(PLACEHOLDER_PNG.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardbg_core::GeneratedImage;

    #[tokio::test]
    async fn test_dummy_text_model() {
        let request = TextRequest {
            instruction: "ignored".to_string(),
            input: "Website title: Acme\nAccent color: #0055ff\nContent: widgets".to_string(),
        };
        let text = DummyTextModel.generate(&request).await.unwrap();
        assert!(text.contains("#0055ff"));

        let request = TextRequest {
            instruction: "ignored".to_string(),
            input: "Accent color: none".to_string(),
        };
        let text = DummyTextModel.generate(&request).await.unwrap();
        assert!(text.contains("muted neutral tones"));
    }

    #[tokio::test]
    async fn test_dummy_image_is_valid_data_uri() {
        let request = ImageRequest {
            model_id: "dummy".to_string(),
            prompt: "anything".to_string(),
        };
        match DummyImageModel.generate(&request).await.unwrap() {
            ImageOutput::Embedded(uri) => {
                let image = GeneratedImage::from_data_uri(uri).unwrap();
                assert_eq!(image.mime_type(), "image/png");
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }
}
