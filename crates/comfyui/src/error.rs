//! Error type shared across the ComfyUI client layers.

use thiserror::Error;

/// Errors from the ComfyUI client.
#[derive(Debug, Error)]
pub enum ComfyError {
    /// The HTTP request itself failed (network, DNS, TLS).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// ComfyUI returned a non-2xx status code.
    #[error("ComfyUI API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// Failed to establish or keep the WebSocket connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// The server executed the workflow and reported a failure.
    #[error("execution failed: {0}")]
    Remote(String),

    /// The bounded wait for a generation expired.
    #[error("generation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Execution finished but no usable output file was found.
    #[error("output missing: {0}")]
    OutputMissing(String),

    /// Workflow template could not be loaded or patched.
    #[error("workflow error: {0}")]
    Workflow(String),

    /// Filesystem access on the shared output mount failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
