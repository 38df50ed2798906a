use std::sync::Arc;
use cardbg_core::{
    Error, FetchedBytes, Fetcher, GeneratedImage, GeneratedPrompt, ImageModel, ImageOutput,
    ImageRequest, Result,
};

/// Turns a prompt into a displayable image with one model call.
///
/// Remote references returned by the model are downloaded and embedded, so
/// callers only ever see a `data:` URI.
pub struct ImageGenerator {
    model: Arc<dyn ImageModel>,
    fetcher: Arc<dyn Fetcher>,
    model_id: String,
}

impl ImageGenerator {
    pub fn new(model: Arc<dyn ImageModel>, fetcher: Arc<dyn Fetcher>, model_id: impl Into<String>) -> Self {
        Self {
            model,
            fetcher,
            model_id: model_id.into(),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub async fn generate(&self, prompt: &GeneratedPrompt) -> Result<GeneratedImage> {
        let request = ImageRequest {
            model_id: self.model_id.clone(),
            prompt: prompt.sentence.clone(),
        };

        tracing::info!("🎨 Generating image with {} ({})", self.model.name(), self.model_id);
        let output = self.model.generate(&request).await.map_err(image_error)?;

        let image = match output {
            ImageOutput::Embedded(data_uri) => GeneratedImage::from_data_uri(data_uri),
            ImageOutput::Remote(url) => {
                tracing::debug!("📥 Resolving remote image {}", url);
                let fetched = self.fetcher.fetch_bytes(&url).await.map_err(image_error)?;
                embed(fetched)
            }
        }
        .map_err(image_error)?;

        tracing::info!("🖼️ Image ready ({})", image.mime_type());
        Ok(image)
    }
}

fn embed(fetched: FetchedBytes) -> Result<GeneratedImage> {
    let declared = fetched
        .content_type
        .filter(|ct| ct.starts_with("image/"));
    let mime = match declared {
        Some(mime) => mime,
        None => sniff_image_mime(&fetched.bytes)
            .ok_or_else(|| Error::ImageGeneration("downloaded file is not an image".to_string()))?
            .to_string(),
    };
    GeneratedImage::from_bytes(&mime, &fetched.bytes)
}

fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    infer::get(bytes)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.mime_type())
}

fn image_error(err: Error) -> Error {
    match err {
        Error::ImageGeneration(_) | Error::Timeout { .. } | Error::Cancelled => err,
        other => Error::ImageGeneration(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardbg_core::testing::{
        CallLog, FakeFetcher, FakeImageModel, ImageBehavior, FETCH_BYTES, IMAGE, PNG_DATA_URI,
    };
    use url::Url;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn remote(log: &CallLog) -> FakeImageModel {
        let url = Url::parse("https://storage.googleapis.com/bucket/bg.png").unwrap();
        FakeImageModel::with_behavior(log, ImageBehavior::Output(ImageOutput::Remote(url)))
    }

    #[tokio::test]
    async fn test_one_call_with_exact_prompt() {
        let log = CallLog::new();
        let model = Arc::new(FakeImageModel::embedded(&log));
        let generator = ImageGenerator::new(
            model.clone(),
            Arc::new(FakeFetcher::html(&log, "")),
            "imagen-4.0-fast-generate-001",
        );

        let prompt = GeneratedPrompt::new("A calm blue gradient.");
        let image = generator.generate(&prompt).await.unwrap();

        assert_eq!(image.data_uri(), PNG_DATA_URI);
        assert_eq!(log.entries(), vec![IMAGE]);
        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, "A calm blue gradient.");
        assert_eq!(requests[0].model_id, "imagen-4.0-fast-generate-001");
    }

    #[tokio::test]
    async fn test_remote_reference_is_embedded() {
        let log = CallLog::new();
        let fetcher = FakeFetcher::html(&log, "").with_bytes(Some("image/png"), PNG_HEADER.to_vec());
        let generator = ImageGenerator::new(Arc::new(remote(&log)), Arc::new(fetcher), "m");

        let image = generator.generate(&GeneratedPrompt::new("waves")).await.unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.decode().unwrap(), PNG_HEADER.to_vec());
        assert_eq!(log.entries(), vec![IMAGE, FETCH_BYTES]);
    }

    #[tokio::test]
    async fn test_remote_mime_is_sniffed_when_header_is_generic() {
        let log = CallLog::new();
        let fetcher = FakeFetcher::html(&log, "")
            .with_bytes(Some("application/octet-stream"), PNG_HEADER.to_vec());
        let generator = ImageGenerator::new(Arc::new(remote(&log)), Arc::new(fetcher), "m");

        let image = generator.generate(&GeneratedPrompt::new("waves")).await.unwrap();
        assert_eq!(image.mime_type(), "image/png");
    }

    #[tokio::test]
    async fn test_remote_non_image_is_image_generation_error() {
        let log = CallLog::new();
        let fetcher = FakeFetcher::html(&log, "").with_bytes(None, b"<html></html>".to_vec());
        let generator = ImageGenerator::new(Arc::new(remote(&log)), Arc::new(fetcher), "m");

        let err = generator.generate(&GeneratedPrompt::new("waves")).await.unwrap_err();
        assert!(matches!(err, Error::ImageGeneration(_)));
    }

    #[tokio::test]
    async fn test_remote_download_failure_is_image_generation_error() {
        let log = CallLog::new();
        let generator = ImageGenerator::new(
            Arc::new(remote(&log)),
            Arc::new(FakeFetcher::html(&log, "")),
            "m",
        );

        let err = generator.generate(&GeneratedPrompt::new("waves")).await.unwrap_err();
        assert!(matches!(err, Error::ImageGeneration(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_model_failure_is_reported() {
        let log = CallLog::new();
        let generator = ImageGenerator::new(
            Arc::new(FakeImageModel::failing(&log, "quota exceeded")),
            Arc::new(FakeFetcher::html(&log, "")),
            "m",
        );

        let err = generator.generate(&GeneratedPrompt::new("waves")).await.unwrap_err();
        assert!(matches!(err, Error::ImageGeneration(ref m) if m == "quota exceeded"));
        assert_eq!(log.count(IMAGE), 1);
    }

    #[tokio::test]
    async fn test_malformed_embedded_output_is_image_generation_error() {
        let log = CallLog::new();
        let model = FakeImageModel::with_behavior(
            &log,
            ImageBehavior::Output(ImageOutput::Embedded("not a data uri".to_string())),
        );
        let generator = ImageGenerator::new(Arc::new(model), Arc::new(FakeFetcher::html(&log, "")), "m");

        let err = generator.generate(&GeneratedPrompt::new("waves")).await.unwrap_err();
        assert!(matches!(err, Error::ImageGeneration(_)));
    }
}
