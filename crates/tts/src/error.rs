//! Error type for the speech-synthesis client.

use thiserror::Error;

/// Errors from the speech-synthesis server.
#[derive(Debug, Error)]
pub enum TtsError {
    /// The HTTP request itself failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("TTS API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The server answered with an empty audio payload.
    #[error("TTS returned no audio for line {line_index}")]
    EmptyAudio { line_index: usize },

    /// Writing the audio file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
