use std::fmt;
use serde::{Deserialize, Serialize};

/// Unit of failure attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Validate,
    Fetch,
    Extract,
    Synthesize,
    Generate,
    Persist,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Synthesize => "synthesize",
            Stage::Generate => "generate",
            Stage::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PipelineState {
    Idle,
    Validating,
    Synthesizing,
    Generating,
    Succeeded,
    Failed { stage: Stage, reason: String },
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Succeeded | PipelineState::Failed { .. })
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => f.write_str("idle"),
            PipelineState::Validating => f.write_str("validating"),
            PipelineState::Synthesizing => f.write_str("synthesizing"),
            PipelineState::Generating => f.write_str("generating"),
            PipelineState::Succeeded => f.write_str("succeeded"),
            PipelineState::Failed { stage, reason } => write!(f, "failed at {}: {}", stage, reason),
        }
    }
}
