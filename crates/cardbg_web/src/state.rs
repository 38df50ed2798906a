use std::sync::Arc;
use cardbg_core::ProfileStore;
use cardbg_pipeline::{ApplyGate, Orchestrator};

pub struct AppState {
    pub orchestrator: Orchestrator,
    pub apply_gate: ApplyGate,
    pub store: Arc<dyn ProfileStore>,
    /// Largest decoded image the apply route will take.
    pub max_image_bytes: usize,
}
