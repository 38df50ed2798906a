use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use cardbg_core::{
    Error, GeneratedImage, Notification, NotificationSink, PipelineError, PipelineState,
    PromptRequest, Result, Stage,
};
use cardbg_inference::synthesizer::freeform_prompt;
use cardbg_inference::{
    create_image_model, create_text_model, ImageGenerator, InferenceConfig, PromptSynthesizer,
};
use cardbg_scrapers::{is_public_host, normalize_url, Extractor, FetcherConfig, HttpFetcher};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub synthesis_timeout: Duration,
    pub generation_timeout: Duration,
    /// When false, website requests naming loopback, private or link-local
    /// hosts fail validation, and the HTTP fetcher refuses them too.
    pub allow_private_hosts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            synthesis_timeout: Duration::from_secs(60),
            generation_timeout: Duration::from_secs(120),
            allow_private_hosts: true,
        }
    }
}

/// Runs Validate → Synthesize → Generate for one request.
///
/// The orchestrator never writes to the profile store; committing a result
/// is the `ApplyGate`'s job. It holds only shared handles to stateless
/// collaborators, so clones can serve concurrent runs.
#[derive(Clone)]
pub struct Orchestrator {
    synthesizer: Arc<PromptSynthesizer>,
    generator: Arc<ImageGenerator>,
    sink: Arc<dyn NotificationSink>,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(
        synthesizer: Arc<PromptSynthesizer>,
        generator: Arc<ImageGenerator>,
        sink: Arc<dyn NotificationSink>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            synthesizer,
            generator,
            sink,
            config,
        }
    }

    /// Wires the HTTP fetcher, the extractor and the configured model
    /// backends into an orchestrator.
    pub fn from_config(
        inference: &InferenceConfig,
        mut fetcher: FetcherConfig,
        config: PipelineConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        fetcher.allow_private_hosts &= config.allow_private_hosts;
        let fetcher = Arc::new(HttpFetcher::new(fetcher)?);
        let text_model = create_text_model(inference)?;
        let image_model = create_image_model(inference)?;
        tracing::debug!(
            "🔧 Pipeline using {} / {} via {}",
            text_model.name(),
            image_model.name(),
            inference.provider
        );

        let synthesizer = PromptSynthesizer::new(fetcher.clone(), Arc::new(Extractor::new()), text_model);
        let generator = ImageGenerator::new(image_model, fetcher, inference.image_model.clone());
        Ok(Self::new(Arc::new(synthesizer), Arc::new(generator), sink, config))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self, request: PromptRequest) -> std::result::Result<GeneratedImage, PipelineError> {
        self.run_with_cancel(request, CancellationToken::new()).await
    }

    pub async fn run_website(&self, url: &str) -> std::result::Result<GeneratedImage, PipelineError> {
        self.run(PromptRequest::website(url)).await
    }

    pub async fn run_freeform(&self, text: &str) -> std::result::Result<GeneratedImage, PipelineError> {
        self.run(PromptRequest::freeform(text)).await
    }

    /// Like `run`, but abandons in-flight work as soon as `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        request: PromptRequest,
        cancel: CancellationToken,
    ) -> std::result::Result<GeneratedImage, PipelineError> {
        tracing::info!("🚀 Starting {} background run", request.kind());
        self.enter(PipelineState::Idle);

        let current = Mutex::new(Stage::Validate);
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let stage = *current.lock().unwrap_or_else(PoisonError::into_inner);
                Err(PipelineError::new(stage, Error::Cancelled))
            }
            result = self.execute(&request, &current) => result,
        };

        match &outcome {
            Ok(_) => {
                self.enter(PipelineState::Succeeded);
                self.sink.notify(&Notification::success(
                    Stage::Generate,
                    "Background Generated!",
                    "Your new background is ready. Apply it to save it to your card.",
                ));
            }
            Err(err) => {
                tracing::error!("💥 Run failed at {}: {}", err.stage, err.error);
                self.enter(PipelineState::Failed {
                    stage: err.stage,
                    reason: err.error.to_string(),
                });
                self.sink
                    .notify(&Notification::failure(err.stage, err.title(), err.user_message()));
            }
        }
        outcome
    }

    async fn execute(
        &self,
        request: &PromptRequest,
        current: &Mutex<Stage>,
    ) -> std::result::Result<GeneratedImage, PipelineError> {
        let mark = |stage: Stage| *current.lock().unwrap_or_else(PoisonError::into_inner) = stage;

        self.enter(PipelineState::Validating);
        self.validate(request)
            .map_err(|e| PipelineError::new(Stage::Validate, e))?;

        self.enter(PipelineState::Synthesizing);
        mark(Stage::Synthesize);
        let prompt = bounded(
            Stage::Synthesize,
            self.config.synthesis_timeout,
            self.synthesizer.synthesize(request),
        )
        .await
        .map_err(|e| PipelineError::attribute(Stage::Synthesize, e))?;

        self.enter(PipelineState::Generating);
        mark(Stage::Generate);
        let image = bounded(
            Stage::Generate,
            self.config.generation_timeout,
            self.generator.generate(&prompt),
        )
        .await
        .map_err(|e| PipelineError::attribute(Stage::Generate, e))?;

        Ok(image)
    }

    fn validate(&self, request: &PromptRequest) -> Result<()> {
        validate_request(request)?;
        if let PromptRequest::Website { url } = request {
            let url = normalize_url(url)?;
            if !self.config.allow_private_hosts && !is_public_host(&url) {
                return Err(Error::Validation(format!(
                    "{} is not a public website",
                    url.host_str().unwrap_or_default()
                )));
            }
        }
        Ok(())
    }

    fn enter(&self, state: PipelineState) {
        tracing::info!("🔄 Pipeline {}", state);
        self.sink.on_state(&state);
    }
}

/// Rejects requests that would otherwise reach the network for nothing.
pub fn validate_request(request: &PromptRequest) -> Result<()> {
    match request {
        PromptRequest::Website { url } => normalize_url(url).map(|_| ()),
        PromptRequest::Freeform { text } => freeform_prompt(text).map(|_| ()),
    }
}

async fn bounded<T>(stage: Stage, after: Duration, future: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(after, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("⏱️ {} exceeded {:?}", stage, after);
            Err(Error::Timeout { stage, after })
        }
    }
}
