//! HTTP client for the speech-synthesis server.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::TtsError;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a single speech-synthesis server.
#[derive(Clone)]
pub struct TtsClient {
    client: reqwest::Client,
    base_url: String,
    voice: String,
}

impl TtsClient {
    /// * `base_url` - e.g. `http://host:5002`.
    /// * `voice`    - speaker preset name.
    ///
    /// `request_timeout` bounds a single synthesis call; lines are
    /// short, so a slow answer means the server is wedged.
    pub fn new(base_url: String, voice: String, request_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url,
            voice,
        }
    }

    /// Synthesize one narration line into `out_dir/line_{index}.wav`.
    pub async fn synthesize(
        &self,
        text: &str,
        line_index: usize,
        out_dir: &Path,
    ) -> Result<PathBuf, TtsError> {
        let response = self
            .client
            .post(format!("{}/api/tts", self.base_url))
            .json(&serde_json::json!({
                "text": text,
                "voice": self.voice,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TtsError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let audio = response.bytes().await?;
        let path = store_audio(&audio, line_index, out_dir).await?;
        tracing::debug!(
            line_index,
            bytes = audio.len(),
            path = %path.display(),
            "Narration line synthesized",
        );
        Ok(path)
    }

    /// Probe server liveness with a short deadline.
    pub async fn health_check(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await;
        match result {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Zero-padded so the encoder's concat manifests sort lexically.
fn line_filename(line_index: usize) -> String {
    format!("line_{line_index:04}.wav")
}

/// Persist one line's audio. An empty payload is an error: the server
/// answered 200 but produced nothing, and writing a zero-byte wav would
/// only fail later inside ffmpeg.
async fn store_audio(audio: &[u8], line_index: usize, out_dir: &Path) -> Result<PathBuf, TtsError> {
    if audio.is_empty() {
        return Err(TtsError::EmptyAudio { line_index });
    }
    let path = out_dir.join(line_filename(line_index));
    tokio::fs::write(&path, audio).await?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
