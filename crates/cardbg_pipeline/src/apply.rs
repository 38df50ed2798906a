use std::sync::Arc;
use cardbg_core::{
    Error, GeneratedImage, Notification, NotificationSink, PipelineError, ProfileStore,
    ProfileUpdate, Stage,
};

/// Commits a generated image to a profile. Only called after the user
/// confirms; the orchestrator never reaches it.
#[derive(Clone)]
pub struct ApplyGate {
    store: Arc<dyn ProfileStore>,
    sink: Arc<dyn NotificationSink>,
}

impl ApplyGate {
    pub fn new(store: Arc<dyn ProfileStore>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { store, sink }
    }

    /// Writes `image` as the profile's card background with a single store
    /// update. The image is borrowed so a failed save can be retried.
    pub async fn apply(&self, profile_id: &str, image: &GeneratedImage) -> Result<(), PipelineError> {
        let result = self.commit(profile_id.trim(), image).await;
        match &result {
            Ok(()) => {
                tracing::info!("💾 Applied background to profile {}", profile_id);
                self.sink.notify(&Notification::success(
                    Stage::Persist,
                    "Background Applied!",
                    "Your new card background has been saved.",
                ));
            }
            Err(err) => {
                tracing::error!("💥 Could not apply background to {:?}: {}", profile_id, err.error);
                self.sink
                    .notify(&Notification::failure(err.stage, err.title(), err.user_message()));
            }
        }
        result
    }

    async fn commit(&self, profile_id: &str, image: &GeneratedImage) -> Result<(), PipelineError> {
        if profile_id.is_empty() {
            return Err(PipelineError::new(
                Stage::Validate,
                Error::Validation("profile id is empty".to_string()),
            ));
        }

        self.store
            .update(profile_id, &ProfileUpdate::card_background(image))
            .await
            .map_err(|e| match e {
                Error::Persistence(_) => PipelineError::new(Stage::Persist, e),
                other => PipelineError::new(Stage::Persist, Error::Persistence(other.to_string())),
            })
    }
}
