use tokio::sync::mpsc;
use cardbg_core::{Notification, NotificationLevel, NotificationSink, PipelineState};

/// Logs notifications and state changes.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notification: &Notification) {
        match notification.level {
            NotificationLevel::Success => {
                tracing::info!("✅ {}: {}", notification.title, notification.message)
            }
            NotificationLevel::Failure => tracing::warn!(
                "❌ [{}] {}: {}",
                notification.stage,
                notification.title,
                notification.message
            ),
        }
    }

    fn on_state(&self, state: &PipelineState) {
        tracing::debug!("🔄 Pipeline {}", state);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _notification: &Notification) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    State(PipelineState),
    Notification(Notification),
}

/// Forwards every event into an unbounded channel. Events sent after the
/// receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notification: &Notification) {
        let _ = self.tx.send(PipelineEvent::Notification(notification.clone()));
    }

    fn on_state(&self, state: &PipelineState) {
        let _ = self.tx.send(PipelineEvent::State(state.clone()));
    }
}
