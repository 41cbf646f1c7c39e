//! Client for the speech-synthesis server.
//!
//! One narration line in, one audio file out. Synthesis failures are
//! retried by the caller; a line that fails permanently is rendered as
//! silence by the encoder, never a missing video.

pub mod client;
pub mod error;

pub use client::TtsClient;
pub use error::TtsError;
