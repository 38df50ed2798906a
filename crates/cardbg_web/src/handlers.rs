use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use cardbg_core::{CardProfile, GeneratedImage, PipelineError, PromptRequest, Stage};
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct WebsiteBody {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct FreeformBody {
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyBody {
    pub data_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundResponse {
    pub data_uri: String,
    pub mime_type: String,
}

impl From<GeneratedImage> for BackgroundResponse {
    fn from(image: GeneratedImage) -> Self {
        Self {
            mime_type: image.mime_type().to_string(),
            data_uri: image.into_data_uri(),
        }
    }
}

pub async fn generate_background(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<BackgroundResponse>, ApiError> {
    let Json(request) = payload?;
    let image = state.orchestrator.run(request).await?;
    Ok(Json(image.into()))
}

pub async fn generate_from_website(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WebsiteBody>, JsonRejection>,
) -> Result<Json<BackgroundResponse>, ApiError> {
    let Json(body) = payload?;
    let image = state.orchestrator.run_website(&body.url).await?;
    Ok(Json(image.into()))
}

pub async fn generate_from_text(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FreeformBody>, JsonRejection>,
) -> Result<Json<BackgroundResponse>, ApiError> {
    let Json(body) = payload?;
    let image = state.orchestrator.run_freeform(&body.text).await?;
    Ok(Json(image.into()))
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CardProfile>, ApiError> {
    state
        .store
        .get(&id)
        .await
        .map_err(|e| PipelineError::new(Stage::Persist, e))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("profile {}", id)))
}

/// The request itself is the user's confirmation.
pub async fn apply_background(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ApplyBody>, JsonRejection>,
) -> Result<Json<CardProfile>, ApiError> {
    let Json(body) = payload?;
    let image = GeneratedImage::from_data_uri(body.data_uri)
        .map_err(|e| PipelineError::new(Stage::Validate, e))?;
    state.apply_gate.apply(&id, &image).await?;
    get_profile(State(state), Path(id)).await
}
