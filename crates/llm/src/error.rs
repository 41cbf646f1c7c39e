//! Error type for the text-generation client.

use thiserror::Error;

/// Errors from the text-generation server.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The HTTP request itself failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("LLM API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The model's output could not be used as requested.
    #[error("malformed model output: {0}")]
    Malformed(String),
}
