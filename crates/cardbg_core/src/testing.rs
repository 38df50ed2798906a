//! Call-recording fakes for the collaborator traits.
//!
//! Every fake shares a `CallLog` so tests can assert both how many calls
//! reached each collaborator and in which order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use url::Url;
use crate::models::{ImageModel, ImageOutput, ImageRequest, TextModel, TextRequest};
use crate::notify::{Notification, NotificationSink};
use crate::scraping::{ContentExtractor, FetchedBytes, Fetcher};
use crate::stage::PipelineState;
use crate::storage::ProfileStore;
use crate::types::{CardProfile, ExtractionResult, ProfileUpdate};
use crate::{Error, Result};

pub const FETCH: &str = "fetch";
pub const FETCH_BYTES: &str = "fetch_bytes";
pub const EXTRACT: &str = "extract";
pub const TEXT: &str = "text";
pub const IMAGE: &str = "image";
pub const STORE_GET: &str = "store.get";
pub const STORE_UPDATE: &str = "store.update";

/// 1×1 transparent PNG.
pub const PNG_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<&'static str>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: &'static str) {
        self.entries.lock().unwrap().push(call);
    }

    pub fn entries(&self) -> Vec<&'static str> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.entries.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    /// True when no call touched the network or a model.
    pub fn no_network_calls(&self) -> bool {
        [FETCH, FETCH_BYTES, TEXT, IMAGE].iter().all(|c| self.count(c) == 0)
    }
}

#[derive(Debug, Clone)]
pub enum FetchBehavior {
    Html(String),
    Fail { status: Option<u16>, message: String },
}

#[derive(Debug)]
pub struct FakeFetcher {
    log: CallLog,
    behavior: FetchBehavior,
    bytes: Option<FetchedBytes>,
    urls: Mutex<Vec<Url>>,
}

impl FakeFetcher {
    pub fn html(log: &CallLog, html: impl Into<String>) -> Self {
        Self::with_behavior(log, FetchBehavior::Html(html.into()))
    }

    pub fn failing(log: &CallLog, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::with_behavior(
            log,
            FetchBehavior::Fail {
                status,
                message: message.into(),
            },
        )
    }

    pub fn with_behavior(log: &CallLog, behavior: FetchBehavior) -> Self {
        Self {
            log: log.clone(),
            behavior,
            bytes: None,
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_bytes(mut self, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        self.bytes = Some(FetchedBytes {
            content_type: content_type.map(str::to_string),
            bytes,
        });
        self
    }

    pub fn urls(&self) -> Vec<Url> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch_html(&self, url: &Url) -> Result<String> {
        self.log.record(FETCH);
        self.urls.lock().unwrap().push(url.clone());
        match &self.behavior {
            FetchBehavior::Html(html) => Ok(html.clone()),
            FetchBehavior::Fail { status, message } => Err(Error::network(*status, message.clone())),
        }
    }

    async fn fetch_bytes(&self, url: &Url) -> Result<FetchedBytes> {
        self.log.record(FETCH_BYTES);
        self.urls.lock().unwrap().push(url.clone());
        self.bytes
            .clone()
            .ok_or_else(|| Error::network(Some(404), format!("{} returned 404 Not Found", url)))
    }
}

/// Wraps a real extractor and records each call.
pub struct RecordingExtractor<E> {
    inner: E,
    log: CallLog,
}

impl<E: ContentExtractor> RecordingExtractor<E> {
    pub fn new(inner: E, log: &CallLog) -> Self {
        Self {
            inner,
            log: log.clone(),
        }
    }
}

impl<E: ContentExtractor> ContentExtractor for RecordingExtractor<E> {
    fn extract(&self, html: &str) -> ExtractionResult {
        self.log.record(EXTRACT);
        self.inner.extract(html)
    }
}

/// Extractor that returns a canned result.
pub struct CannedExtractor(pub ExtractionResult);

impl ContentExtractor for CannedExtractor {
    fn extract(&self, _html: &str) -> ExtractionResult {
        self.0.clone()
    }
}

#[derive(Debug)]
pub struct FakeTextModel {
    log: CallLog,
    reply: std::result::Result<String, String>,
    hang: bool,
    requests: Mutex<Vec<TextRequest>>,
}

impl FakeTextModel {
    pub fn replying(log: &CallLog, reply: impl Into<String>) -> Self {
        Self {
            log: log.clone(),
            reply: Ok(reply.into()),
            hang: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Never replies.
    pub fn hanging(log: &CallLog) -> Self {
        Self {
            hang: true,
            ..Self::replying(log, "")
        }
    }

    pub fn failing(log: &CallLog, message: impl Into<String>) -> Self {
        Self {
            log: log.clone(),
            reply: Err(message.into()),
            hang: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<TextRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextModel for FakeTextModel {
    fn name(&self) -> &str {
        "Fake"
    }

    async fn generate(&self, request: &TextRequest) -> Result<String> {
        self.log.record(TEXT);
        self.requests.lock().unwrap().push(request.clone());
        if self.hang {
            return std::future::pending().await;
        }
        self.reply.clone().map_err(Error::PromptGeneration)
    }
}

#[derive(Debug, Clone)]
pub enum ImageBehavior {
    Output(ImageOutput),
    Fail(String),
    /// Never completes; used for timeout and cancellation tests.
    Hang,
}

#[derive(Debug)]
pub struct FakeImageModel {
    log: CallLog,
    behavior: ImageBehavior,
    requests: Mutex<Vec<ImageRequest>>,
}

impl FakeImageModel {
    pub fn embedded(log: &CallLog) -> Self {
        Self::with_behavior(log, ImageBehavior::Output(ImageOutput::Embedded(PNG_DATA_URI.to_string())))
    }

    pub fn failing(log: &CallLog, message: impl Into<String>) -> Self {
        Self::with_behavior(log, ImageBehavior::Fail(message.into()))
    }

    pub fn with_behavior(log: &CallLog, behavior: ImageBehavior) -> Self {
        Self {
            log: log.clone(),
            behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ImageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageModel for FakeImageModel {
    fn name(&self) -> &str {
        "Fake"
    }

    async fn generate(&self, request: &ImageRequest) -> Result<ImageOutput> {
        self.log.record(IMAGE);
        self.requests.lock().unwrap().push(request.clone());
        match &self.behavior {
            ImageBehavior::Output(output) => Ok(output.clone()),
            ImageBehavior::Fail(message) => Err(Error::ImageGeneration(message.clone())),
            ImageBehavior::Hang => std::future::pending().await,
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeProfileStore {
    log: CallLog,
    profiles: Mutex<HashMap<String, CardProfile>>,
    updates: Mutex<Vec<(String, ProfileUpdate)>>,
    fail_updates: AtomicBool,
}

impl FakeProfileStore {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            ..Self::default()
        }
    }

    pub fn with_profile(self, profile: CardProfile) -> Self {
        self.profiles.lock().unwrap().insert(profile.id.clone(), profile);
        self
    }

    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn updates(&self) -> Vec<(String, ProfileUpdate)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn profile(&self, id: &str) -> Option<CardProfile> {
        self.profiles.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl ProfileStore for FakeProfileStore {
    async fn get(&self, id: &str) -> Result<Option<CardProfile>> {
        self.log.record(STORE_GET);
        Ok(self.profile(id))
    }

    async fn update(&self, id: &str, update: &ProfileUpdate) -> Result<()> {
        self.log.record(STORE_UPDATE);
        self.updates.lock().unwrap().push((id.to_string(), update.clone()));
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Error::Persistence("write rejected".to_string()));
        }
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .get_mut(id)
            .ok_or_else(|| Error::Persistence(format!("profile {} not found", id)))?;
        update.merge_into(profile);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    notifications: Mutex<Vec<Notification>>,
    states: Mutex<Vec<PipelineState>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<PipelineState> {
        self.states.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: &Notification) {
        self.notifications.lock().unwrap().push(notification.clone());
    }

    fn on_state(&self, state: &PipelineState) {
        self.states.lock().unwrap().push(state.clone());
    }
}
