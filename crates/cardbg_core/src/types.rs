use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::{Error, Result};

/// Character budget for `ExtractionResult::truncated_content`.
pub const MAX_CONTENT_CHARS: usize = 1500;

/// Content used when a document could not be parsed at all.
pub const EXTRACTION_PLACEHOLDER: &str =
    "Error extracting website details. Please check the URL and try again.";

/// Bounded brand signal pulled out of one HTML document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub title: String,
    pub meta_description: String,
    pub keywords: String,
    pub headings: Vec<String>,
    pub paragraphs: Vec<String>,
    pub accent_color: Option<String>,
    pub truncated_content: String,
}

impl ExtractionResult {
    pub fn degraded() -> Self {
        Self {
            truncated_content: EXTRACTION_PLACEHOLDER.to_string(),
            ..Self::default()
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.truncated_content == EXTRACTION_PLACEHOLDER && self.title.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.meta_description.is_empty()
            && self.keywords.is_empty()
            && self.truncated_content.is_empty()
            && self.accent_color.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PromptRequest {
    Website { url: String },
    Freeform { text: String },
}

impl PromptRequest {
    pub fn website(url: impl Into<String>) -> Self {
        Self::Website { url: url.into() }
    }

    pub fn freeform(text: impl Into<String>) -> Self {
        Self::Freeform { text: text.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PromptRequest::Website { .. } => "website",
            PromptRequest::Freeform { .. } => "freeform",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPrompt {
    pub sentence: String,
}

impl GeneratedPrompt {
    pub fn new(sentence: impl Into<String>) -> Self {
        Self { sentence: sentence.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.sentence
    }
}

/// An image embedded as `data:<mime>;base64,<payload>`.
///
/// Construction validates the shape, so a value of this type is always
/// displayable without another round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawGeneratedImage")]
pub struct GeneratedImage {
    data_uri: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGeneratedImage {
    data_uri: String,
}

impl TryFrom<RawGeneratedImage> for GeneratedImage {
    type Error = Error;

    fn try_from(raw: RawGeneratedImage) -> Result<Self> {
        Self::from_data_uri(raw.data_uri)
    }
}

impl GeneratedImage {
    pub fn from_data_uri(data_uri: impl Into<String>) -> Result<Self> {
        let data_uri = data_uri.into();
        let (mime, payload) = split_data_uri(&data_uri)
            .ok_or_else(|| Error::Validation("image must be a base64 data URI".to_string()))?;
        if mime.is_empty() || !mime.contains('/') {
            return Err(Error::Validation(format!("invalid image MIME type: {:?}", mime)));
        }
        if payload.is_empty() {
            return Err(Error::Validation("image payload is empty".to_string()));
        }
        BASE64
            .decode(payload)
            .map_err(|e| Error::Validation(format!("image payload is not valid base64: {}", e)))?;
        Ok(Self { data_uri })
    }

    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Result<Self> {
        let mime_type = mime_type.trim();
        if bytes.is_empty() {
            return Err(Error::Validation("image payload is empty".to_string()));
        }
        if !mime_type.contains('/') {
            return Err(Error::Validation(format!("invalid image MIME type: {:?}", mime_type)));
        }
        Ok(Self {
            data_uri: format!("data:{};base64,{}", mime_type, BASE64.encode(bytes)),
        })
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    pub fn into_data_uri(self) -> String {
        self.data_uri
    }

    pub fn mime_type(&self) -> &str {
        split_data_uri(&self.data_uri).map(|(mime, _)| mime).unwrap_or_default()
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        let (_, payload) = split_data_uri(&self.data_uri)
            .ok_or_else(|| Error::Validation("image must be a base64 data URI".to_string()))?;
        BASE64
            .decode(payload)
            .map_err(|e| Error::Validation(format!("image payload is not valid base64: {}", e)))
    }

    /// File extension matching the MIME type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type() {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "bin",
        }
    }
}

fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    Some((mime, payload))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardTier {
    Bronze,
    Silver,
    Gold,
    Diamond,
}

/// Profile record owned by the profile store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardProfile {
    pub id: String,
    pub name: String,
    pub role: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub avatar_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_background_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_tier: Option<CardTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Merge-style partial update. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_background_url: Option<String>,
}

impl ProfileUpdate {
    pub fn card_background(image: &GeneratedImage) -> Self {
        Self {
            card_background_url: Some(image.data_uri().to_string()),
            ..Self::default()
        }
    }

    /// Names of the fields this update would write, in camelCase.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let slots: [(&'static str, bool); 8] = [
            ("name", self.name.is_some()),
            ("role", self.role.is_some()),
            ("company", self.company.is_some()),
            ("email", self.email.is_some()),
            ("phone", self.phone.is_some()),
            ("website", self.website.is_some()),
            ("avatarUrl", self.avatar_url.is_some()),
            ("cardBackgroundUrl", self.card_background_url.is_some()),
        ];
        for (name, set) in slots {
            if set {
                fields.push(name);
            }
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    pub fn merge_into(&self, profile: &mut CardProfile) {
        fn set(slot: &mut String, value: &Option<String>) {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }
        set(&mut profile.name, &self.name);
        set(&mut profile.role, &self.role);
        set(&mut profile.company, &self.company);
        set(&mut profile.email, &self.email);
        set(&mut profile.phone, &self.phone);
        set(&mut profile.website, &self.website);
        set(&mut profile.avatar_url, &self.avatar_url);
        if let Some(url) = &self.card_background_url {
            profile.card_background_url = Some(url.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn test_generated_image_accepts_data_uri() {
        let image = GeneratedImage::from_data_uri(PNG_URI).unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.extension(), "png");
        assert_eq!(image.decode().unwrap()[..4], [0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_generated_image_rejects_references() {
        assert!(GeneratedImage::from_data_uri("https://cdn.example.com/bg.png").is_err());
        assert!(GeneratedImage::from_data_uri("data:image/png;base64,").is_err());
        assert!(GeneratedImage::from_data_uri("data:;base64,AAAA").is_err());
        assert!(GeneratedImage::from_data_uri("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn test_generated_image_from_bytes() {
        let image = GeneratedImage::from_bytes("image/jpeg", &[1, 2, 3]).unwrap();
        assert!(image.data_uri().starts_with("data:image/jpeg;base64,"));
        assert_eq!(image.decode().unwrap(), vec![1, 2, 3]);
        assert!(GeneratedImage::from_bytes("image/jpeg", &[]).is_err());
    }

    #[test]
    fn test_generated_image_deserialize_validates() {
        let json = format!(r#"{{"dataUri":"{}"}}"#, PNG_URI);
        let image: GeneratedImage = serde_json::from_str(&json).unwrap();
        assert_eq!(image.data_uri(), PNG_URI);
        assert_eq!(serde_json::to_string(&image).unwrap(), json);

        let bad = r#"{"dataUri":"http://example.com/a.png"}"#;
        assert!(serde_json::from_str::<GeneratedImage>(bad).is_err());
    }

    #[test]
    fn test_prompt_request_wire_format() {
        let request: PromptRequest =
            serde_json::from_str(r#"{"kind":"website","url":"example.com"}"#).unwrap();
        assert_eq!(request, PromptRequest::website("example.com"));

        let request: PromptRequest =
            serde_json::from_str(r#"{"kind":"freeform","text":"waves"}"#).unwrap();
        assert_eq!(request.kind(), "freeform");

        assert!(serde_json::from_str::<PromptRequest>(r#"{"kind":"website"}"#).is_err());
    }

    #[test]
    fn test_profile_update_merge_only_touches_set_fields() {
        let mut profile = CardProfile {
            id: "u1".into(),
            name: "Ada".into(),
            company: "Acme".into(),
            card_background_url: Some("data:image/png;base64,AAAA".into()),
            ..CardProfile::default()
        };
        let image = GeneratedImage::from_data_uri(PNG_URI).unwrap();
        let update = ProfileUpdate::card_background(&image);
        assert_eq!(update.fields(), vec!["cardBackgroundUrl"]);

        update.merge_into(&mut profile);
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.company, "Acme");
        assert_eq!(profile.card_background_url.as_deref(), Some(PNG_URI));

        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_degraded_extraction() {
        let result = ExtractionResult::degraded();
        assert!(result.is_degraded());
        assert!(!ExtractionResult::default().is_degraded());
        assert!(ExtractionResult::default().is_empty());
    }
}
