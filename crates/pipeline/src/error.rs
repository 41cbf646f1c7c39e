//! Pipeline error type.
//!
//! A failed phase surfaces as one `PipelineError` carrying the phase
//! name and a human-readable reason; the worker writes that reason to
//! the post's `failure_reason` column.

use thiserror::Error;

/// Pipeline phases that can fail, in execution order.
///
/// Resource analysis, validation, and mode assignment are pure
/// functions of data already in hand and cannot fail, so they have no
/// variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Chunking,
    ScenePlanning,
    Narration,
    Prompts,
    ClipGeneration,
    Encoding,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chunking => "chunking",
            Self::ScenePlanning => "scene_planning",
            Self::Narration => "narration",
            Self::Prompts => "prompts",
            Self::ClipGeneration => "clip_generation",
            Self::Encoding => "encoding",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fatal failure in one pipeline phase.
#[derive(Debug, Error)]
#[error("{phase} failed: {reason}")]
pub struct PipelineError {
    pub phase: Phase,
    pub reason: String,
}

impl PipelineError {
    pub fn new(phase: Phase, reason: impl std::fmt::Display) -> Self {
        Self {
            phase,
            reason: reason.to_string(),
        }
    }
}
