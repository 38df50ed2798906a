use std::sync::Arc;
use cardbg_core::{
    ContentExtractor, Error, ExtractionResult, Fetcher, GeneratedPrompt, PromptRequest, Result,
    TextModel, TextRequest,
};
use cardbg_scrapers::normalize_url;

/// Wrapper applied once to free-text requests.
pub const FREEFORM_STYLE_PREFIX: &str = "a subtle, professional, non-distracting background depicting: ";

/// The single instruction used for website requests. The extracted details
/// travel separately as the request input.
pub const WEBSITE_INSTRUCTION: &str = "You write prompts for an abstract background image generator. \
Using the website details provided, describe one background image for a digital business card that \
matches the brand: its colors, patterns, textures and overall mood. The background must be \
professional, subtle and not distracting, because names and contact details are printed on top of it. \
The image must not contain any text, letters, words, numbers, logos or watermarks. \
Reply with exactly one sentence and nothing else.";

pub struct PromptSynthesizer {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn ContentExtractor>,
    text_model: Arc<dyn TextModel>,
}

impl PromptSynthesizer {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn ContentExtractor>,
        text_model: Arc<dyn TextModel>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            text_model,
        }
    }

    pub async fn synthesize(&self, request: &PromptRequest) -> Result<GeneratedPrompt> {
        match request {
            PromptRequest::Website { url } => self.from_website(url).await,
            PromptRequest::Freeform { text } => freeform_prompt(text),
        }
    }

    async fn from_website(&self, raw_url: &str) -> Result<GeneratedPrompt> {
        let url = normalize_url(raw_url)?;

        tracing::info!("🌐 Fetching {}", url);
        let html = self.fetcher.fetch_html(&url).await?;

        let extraction = self.extractor.extract(&html);
        if extraction.is_degraded() {
            tracing::warn!("⚠️ Using placeholder details for {}", url);
        }

        let request = TextRequest {
            instruction: WEBSITE_INSTRUCTION.to_string(),
            input: render_website_details(&extraction),
        };
        tracing::info!("🤖 Asking {} for a background prompt", self.text_model.name());
        let reply = self
            .text_model
            .generate(&request)
            .await
            .map_err(prompt_error)?;

        let sentence = normalize_sentence(&reply).ok_or_else(|| {
            Error::PromptGeneration(format!("{} returned an empty prompt", self.text_model.name()))
        })?;
        tracing::info!("✨ Prompt: {}", sentence);
        Ok(GeneratedPrompt::new(sentence))
    }
}

pub fn freeform_prompt(text: &str) -> Result<GeneratedPrompt> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return Err(Error::Validation("background description is empty".to_string()));
    }
    Ok(GeneratedPrompt::new(format!("{}{}", FREEFORM_STYLE_PREFIX, text)))
}

/// Structured input block for the website instruction.
pub fn render_website_details(extraction: &ExtractionResult) -> String {
    fn or_none(value: &str) -> &str {
        if value.trim().is_empty() {
            "none"
        } else {
            value
        }
    }

    format!(
        "Website title: {}\nDescription: {}\nKeywords: {}\nAccent color: {}\nContent: {}",
        or_none(&extraction.title),
        or_none(&extraction.meta_description),
        or_none(&extraction.keywords),
        extraction.accent_color.as_deref().unwrap_or("none"),
        or_none(&extraction.truncated_content),
    )
}

/// Collapses a model reply onto one line and strips wrapping quotes.
/// Returns `None` when nothing is left.
pub fn normalize_sentence(reply: &str) -> Option<String> {
    const QUOTES: &[char] = &['"', '\'', '`', '“', '”', '‘', '’'];

    let collapsed = reply.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(|c: char| QUOTES.contains(&c)).trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn prompt_error(err: Error) -> Error {
    match err {
        Error::PromptGeneration(_) | Error::Timeout { .. } | Error::Cancelled => err,
        other => Error::PromptGeneration(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardbg_core::testing::{
        CallLog, CannedExtractor, FakeFetcher, FakeTextModel, RecordingExtractor, EXTRACT, FETCH,
        TEXT,
    };
    use cardbg_core::EXTRACTION_PLACEHOLDER;
    use cardbg_scrapers::Extractor;

    const ACME: &str = r#"<html><head><title>Acme Corp</title>
        <meta name="description" content="We build widgets">
        <style>h1 { color: #0055FF }</style></head>
        <body><h1>Widgets</h1><p>Built to last.</p></body></html>"#;

    fn synthesizer(log: &CallLog, fetcher: FakeFetcher, model: Arc<FakeTextModel>) -> PromptSynthesizer {
        PromptSynthesizer::new(
            Arc::new(fetcher),
            Arc::new(RecordingExtractor::new(Extractor::new(), log)),
            model,
        )
    }

    #[tokio::test]
    async fn test_freeform_skips_text_model() {
        let log = CallLog::new();
        let model = Arc::new(FakeTextModel::replying(&log, "unused"));
        let synth = synthesizer(&log, FakeFetcher::html(&log, ACME), model);

        let prompt = synth
            .synthesize(&PromptRequest::freeform("blue and gold abstract waves"))
            .await
            .unwrap();
        assert_eq!(
            prompt.sentence,
            "a subtle, professional, non-distracting background depicting: blue and gold abstract waves"
        );
        assert!(log.entries().is_empty());
    }

    #[tokio::test]
    async fn test_website_calls_fetch_extract_text_in_order() {
        let log = CallLog::new();
        let model = Arc::new(FakeTextModel::replying(
            &log,
            "  \"A calm blue gradient with faint\n interlocking gear outlines.\"  ",
        ));
        let fetcher = FakeFetcher::html(&log, ACME);
        let synth = synthesizer(&log, fetcher, model.clone());

        let prompt = synth.synthesize(&PromptRequest::website("example.com")).await.unwrap();
        assert_eq!(prompt.sentence, "A calm blue gradient with faint interlocking gear outlines.");
        assert_eq!(log.entries(), vec![FETCH, EXTRACT, TEXT]);

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].instruction, WEBSITE_INSTRUCTION);
        assert!(requests[0].input.contains("Website title: Acme Corp"));
        assert!(requests[0].input.contains("Description: We build widgets"));
        assert!(requests[0].input.contains("Accent color: #0055FF"));
        assert!(requests[0].input.contains("Content: Widgets Built to last."));
    }

    #[tokio::test]
    async fn test_website_url_gets_https_scheme() {
        let log = CallLog::new();
        let fetcher = Arc::new(FakeFetcher::html(&log, ACME));
        let synth = PromptSynthesizer::new(
            fetcher.clone(),
            Arc::new(Extractor::new()),
            Arc::new(FakeTextModel::replying(&log, "A sentence.")),
        );
        synth.synthesize(&PromptRequest::website("example.com")).await.unwrap();
        assert_eq!(fetcher.urls()[0].as_str(), "https://example.com/");
    }

    #[tokio::test]
    async fn test_empty_reply_is_prompt_generation_error() {
        for reply in ["", "   \n ", "\"\""] {
            let log = CallLog::new();
            let model = Arc::new(FakeTextModel::replying(&log, reply));
            let synth = synthesizer(&log, FakeFetcher::html(&log, ACME), model);

            let err = synth.synthesize(&PromptRequest::website("example.com")).await.unwrap_err();
            assert!(matches!(err, Error::PromptGeneration(_)), "reply {:?} gave {:?}", reply, err);
            assert_eq!(log.count(TEXT), 1);
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_stops_before_text_model() {
        let log = CallLog::new();
        let model = Arc::new(FakeTextModel::replying(&log, "unused"));
        let synth = synthesizer(&log, FakeFetcher::failing(&log, None, "host unreachable"), model);

        let err = synth.synthesize(&PromptRequest::website("example.com")).await.unwrap_err();
        assert!(matches!(err, Error::Network { .. }));
        assert_eq!(log.entries(), vec![FETCH]);
    }

    #[tokio::test]
    async fn test_degraded_extraction_still_reaches_model() {
        let log = CallLog::new();
        let model = Arc::new(FakeTextModel::replying(&log, "A neutral gradient."));
        let synth = PromptSynthesizer::new(
            Arc::new(FakeFetcher::html(&log, "<p>x</p>")),
            Arc::new(CannedExtractor(ExtractionResult::degraded())),
            model.clone(),
        );

        synth.synthesize(&PromptRequest::website("example.com")).await.unwrap();
        assert!(model.requests()[0].input.contains(EXTRACTION_PLACEHOLDER));
    }

    #[test]
    fn test_freeform_prompt_validation() {
        assert!(matches!(freeform_prompt("  "), Err(Error::Validation(_))));
        assert_eq!(
            freeform_prompt(" misty\n forest ").unwrap().sentence,
            format!("{}misty forest", FREEFORM_STYLE_PREFIX)
        );
    }

    #[test]
    fn test_render_website_details_marks_missing_fields() {
        let details = render_website_details(&ExtractionResult::default());
        assert_eq!(
            details,
            "Website title: none\nDescription: none\nKeywords: none\nAccent color: none\nContent: none"
        );
    }

    #[test]
    fn test_normalize_sentence() {
        assert_eq!(normalize_sentence("“Soft waves.”").as_deref(), Some("Soft waves."));
        assert_eq!(normalize_sentence("line one\nline two").as_deref(), Some("line one line two"));
        assert_eq!(normalize_sentence(" ' ' "), None);
    }
}
