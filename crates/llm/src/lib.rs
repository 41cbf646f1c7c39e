//! Client for the local text-generation server.
//!
//! Wraps the Ollama-style HTTP API for plain and JSON-constrained
//! generation, plus the explicit model unload used to hand accelerator
//! memory over to the video act.

pub mod client;
pub mod error;
pub mod prompts;

pub use client::LlmClient;
pub use error::LlmError;
pub use prompts::{PromptContext, PromptEngine};
