use std::fmt;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;
use cardbg_core::{Error, ImageModel, ImageOutput, ImageRequest, Result, TextModel, TextRequest};
use crate::InferenceConfig;

/// Shared transport for the Gemini API (`generateContent` and `predict`).
#[derive(Clone)]
struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    fn new(config: &InferenceConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Validation("Gemini API key is required".to_string()))?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::External(e.into()))?;
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Posts `body` and decodes the reply. Errors are upstream messages,
    /// left for the caller to attach to its own stage.
    async fn post<B, R>(&self, model: &str, method: &str, body: &B) -> std::result::Result<R, String>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/models/{}:{}", self.base_url, model, method);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    format!("request to {} timed out", model)
                } else {
                    e.to_string()
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream_message(status.as_u16(), &body));
        }
        response
            .json::<R>()
            .await
            .map_err(|e| format!("invalid response from {}: {}", model, e))
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

fn upstream_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => format!("HTTP {}: {}", status, parsed.error.message),
        Err(_) => {
            let snippet: String = body.chars().take(200).collect();
            if snippet.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                format!("HTTP {}: {}", status, snippet.trim())
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    candidate_count: u32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

pub struct GeminiTextModel {
    client: GeminiClient,
    model: String,
}

impl GeminiTextModel {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        Ok(Self {
            client: GeminiClient::new(config)?,
            model: config.text_model.clone(),
        })
    }
}

impl fmt::Debug for GeminiTextModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiTextModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.client.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl TextModel for GeminiTextModel {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn generate(&self, request: &TextRequest) -> Result<String> {
        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: Some(request.instruction.clone()),
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(request.input.clone()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                candidate_count: 1,
                max_output_tokens: 256,
            },
        };

        let response: GenerateContentResponse = self
            .client
            .post(&self.model, "generateContent", &body)
            .await
            .map_err(Error::PromptGeneration)?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        tracing::debug!("🤖 {} replied with {} chars", self.model, text.len());
        Ok(text)
    }
}

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: String,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
    gcs_uri: Option<String>,
    uri: Option<String>,
    rai_filtered_reason: Option<String>,
}

/// Imagen through the Gemini API `predict` method.
pub struct ImagenModel {
    client: GeminiClient,
    aspect_ratio: String,
}

impl ImagenModel {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        Ok(Self {
            client: GeminiClient::new(config)?,
            aspect_ratio: "16:9".to_string(),
        })
    }
}

impl fmt::Debug for ImagenModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagenModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.client.base_url)
            .field("aspect_ratio", &self.aspect_ratio)
            .finish()
    }
}

#[async_trait]
impl ImageModel for ImagenModel {
    fn name(&self) -> &str {
        "Imagen"
    }

    async fn generate(&self, request: &ImageRequest) -> Result<ImageOutput> {
        let body = PredictRequest {
            instances: vec![PredictInstance {
                prompt: request.prompt.clone(),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: self.aspect_ratio.clone(),
            },
        };

        let response: PredictResponse = self
            .client
            .post(&request.model_id, "predict", &body)
            .await
            .map_err(Error::ImageGeneration)?;

        first_image(response.predictions)
    }
}

fn first_image(predictions: Vec<Prediction>) -> Result<ImageOutput> {
    let mut filtered = None;
    for prediction in predictions {
        if let Some(bytes) = prediction.bytes_base64_encoded.filter(|b| !b.is_empty()) {
            let mime = prediction.mime_type.unwrap_or_else(|| "image/png".to_string());
            return Ok(ImageOutput::Embedded(format!("data:{};base64,{}", mime, bytes)));
        }
        if let Some(url) = prediction.uri.or(prediction.gcs_uri).and_then(|u| remote_url(&u)) {
            return Ok(ImageOutput::Remote(url));
        }
        if prediction.rai_filtered_reason.is_some() {
            filtered = prediction.rai_filtered_reason;
        }
    }
    match filtered {
        Some(reason) => Err(Error::ImageGeneration(format!("image was filtered: {}", reason))),
        None => Err(Error::ImageGeneration("model returned no image".to_string())),
    }
}

/// `gs://bucket/object` is served over HTTPS by the storage frontend.
fn remote_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    let candidate = match raw.strip_prefix("gs://") {
        Some(path) => format!("https://storage.googleapis.com/{}", path),
        None => raw.to_string(),
    };
    Url::parse(&candidate)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
}
