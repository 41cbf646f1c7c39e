//! The content pipeline: from an approved post to a rendered video.
//!
//! Phases run strictly in order, each consuming the previous phase's
//! output: resource analysis, script chunking, validation, scene
//! planning, mode assignment, narration synthesis, prompt generation,
//! clip generation, final encode. The orchestrator wires them together
//! and routes every accelerator-heavy act through the memory arbiter.

pub mod analyzer;
pub mod chunker;
pub mod clip_engine;
pub mod director;
pub mod encoder;
pub mod error;
pub mod modes;
pub mod narration;
pub mod orchestrator;
pub mod prompts;
pub mod services;

pub use error::{Phase, PipelineError};
pub use orchestrator::{Orchestrator, PipelineConfig, PipelineInput, PipelineOutput};
