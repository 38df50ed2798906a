use std::time::Duration;
use thiserror::Error;
use crate::stage::Stage;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Network error{}: {message}", status_suffix(.status))]
    Network {
        status: Option<u16>,
        message: String,
    },

    #[error("Prompt generation error: {0}")]
    PromptGeneration(String),

    #[error("Image generation error: {0}")]
    ImageGeneration(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("{stage} timed out after {}s", .after.as_secs())]
    Timeout {
        stage: Stage,
        after: Duration,
    },

    #[error("Request was cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl Error {
    pub fn network(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Network {
            status,
            message: message.into(),
        }
    }

    /// The stage a failure belongs to when the variant alone decides it.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Validation(_) => Some(Stage::Validate),
            Error::Network { .. } => Some(Stage::Fetch),
            Error::PromptGeneration(_) => Some(Stage::Synthesize),
            Error::ImageGeneration(_) => Some(Stage::Generate),
            Error::Persistence(_) => Some(Stage::Persist),
            Error::Timeout { stage, .. } => Some(*stage),
            Error::Cancelled | Error::Serialization(_) | Error::External(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A failure tagged with the stage that produced it.
#[derive(Error, Debug)]
#[error("{stage} stage failed: {error}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub error: Error,
}

impl PipelineError {
    pub fn new(stage: Stage, error: Error) -> Self {
        Self { stage, error }
    }

    /// Attributes `error` to its own stage, or to `fallback` when the
    /// variant does not name one.
    pub fn attribute(fallback: Stage, error: Error) -> Self {
        let stage = error.stage().unwrap_or(fallback);
        Self { stage, error }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, Error::Cancelled)
    }

    /// Short headline for a toast.
    pub fn title(&self) -> &'static str {
        match self.stage {
            Stage::Validate => "Missing input",
            Stage::Fetch | Stage::Extract => "Could not read that website",
            Stage::Synthesize | Stage::Generate => "Could not generate an image",
            Stage::Persist => "Could not save your background",
        }
    }

    /// Human message that tells the user which step to retry.
    pub fn user_message(&self) -> String {
        if self.is_cancelled() {
            return "Generation was cancelled.".to_string();
        }
        let hint = match self.stage {
            Stage::Validate => "Please enter a website URL or a description.",
            Stage::Fetch | Stage::Extract => {
                "We could not read that website. Check the address or try a different one."
            }
            Stage::Synthesize | Stage::Generate => {
                "We could not generate an image. Please try again."
            }
            Stage::Persist => {
                "We could not save your background. Your generated image is kept, try saving again."
            }
        };
        format!("{} ({})", hint, self.error)
    }
}
