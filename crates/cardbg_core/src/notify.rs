use serde::Serialize;
use crate::stage::{PipelineState, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Failure,
}

/// A discrete event the host renders as a toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub stage: Stage,
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn success(stage: Stage, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            level: NotificationLevel::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn failure(stage: Stage, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            level: NotificationLevel::Failure,
            title: title.into(),
            message: message.into(),
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: &Notification);

    fn on_state(&self, _state: &PipelineState) {}
}
