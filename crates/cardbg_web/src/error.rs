use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use cardbg_core::{Error, PipelineError, Stage};

#[derive(Debug)]
pub enum ApiError {
    Pipeline(PipelineError),
    NotFound(String),
    /// Body could not be read or decoded as the expected JSON.
    Rejected(JsonRejection),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,
    error: String,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Rejected(rejection) => rejection.status(),
            ApiError::Pipeline(err) => match (&err.error, err.stage) {
                (Error::Timeout { .. }, _) => StatusCode::GATEWAY_TIMEOUT,
                (Error::Cancelled, _) => StatusCode::SERVICE_UNAVAILABLE,
                (_, Stage::Validate) => StatusCode::BAD_REQUEST,
                (_, Stage::Persist) => StatusCode::INTERNAL_SERVER_ERROR,
                (_, Stage::Fetch | Stage::Extract | Stage::Synthesize | Stage::Generate) => {
                    StatusCode::BAD_GATEWAY
                }
            },
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Pipeline(err) => ErrorBody {
                stage: Some(err.stage),
                error: err.error.to_string(),
                message: err.user_message(),
            },
            ApiError::NotFound(what) => ErrorBody {
                stage: None,
                error: format!("{} not found", what),
                message: format!("We could not find {}.", what),
            },
            ApiError::Rejected(rejection) => ErrorBody {
                stage: Some(Stage::Validate),
                message: if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    "That image is too large to save.".to_string()
                } else {
                    "The request could not be read.".to_string()
                },
                error: rejection.body_text(),
            },
        };
        (status, Json(body)).into_response()
    }
}
