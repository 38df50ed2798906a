pub mod apply;
pub mod logging;
pub mod orchestrator;
pub mod sinks;

pub use apply::ApplyGate;
pub use logging::init_logging;
pub use orchestrator::{validate_request, Orchestrator, PipelineConfig};
pub use sinks::{ChannelSink, NullSink, PipelineEvent, TracingSink};
pub use tokio_util::sync::CancellationToken;

pub mod prelude {
    pub use super::{ApplyGate, CancellationToken, Orchestrator, PipelineConfig};
    pub use cardbg_core::prelude::*;
}
