//! REST API wrapper for the ComfyUI HTTP endpoints.
//!
//! Covers workflow submission, history retrieval, interruption, model
//! unloading, image upload, and the health probe, all via [`reqwest`].

use std::time::Duration;

use serde::Deserialize;

use crate::error::ComfyError;

/// How long the health probe waits before declaring the server down.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for a single ComfyUI server.
#[derive(Clone)]
pub struct ComfyApi {
    client: reqwest::Client,
    api_url: String,
}

/// Response from `POST /prompt` after a workflow is queued.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned identifier for the queued prompt.
    pub prompt_id: String,
    /// Position in the execution queue.
    pub number: i32,
}

/// Response from `POST /upload/image`.
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    /// Server-side filename to reference from workflow inputs.
    pub name: String,
    #[serde(default)]
    pub subfolder: String,
}

impl ComfyApi {
    /// Create a new API client.
    ///
    /// * `api_url` - base HTTP URL, e.g. `http://host:8188`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }

    /// Base HTTP URL of the server.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Submit a workflow for execution.
    ///
    /// Sends `POST /prompt` with the workflow JSON and the caller's
    /// WebSocket client ID so push messages can be correlated.
    pub async fn submit_workflow(
        &self,
        workflow: &serde_json::Value,
        client_id: &str,
    ) -> Result<SubmitResponse, ComfyError> {
        let body = serde_json::json!({
            "prompt": workflow,
            "client_id": client_id,
        });

        let response = self
            .client
            .post(format!("{}/prompt", self.api_url))
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Retrieve execution history for a prompt.
    ///
    /// Sends `GET /history/{prompt_id}`. The returned JSON carries the
    /// completion status and output file names.
    pub async fn get_history(&self, prompt_id: &str) -> Result<serde_json::Value, ComfyError> {
        let response = self
            .client
            .get(format!("{}/history/{}", self.api_url, prompt_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Interrupt whatever is executing right now.
    ///
    /// Sends `POST /interrupt`. Not targeted at a specific prompt.
    pub async fn interrupt(&self) -> Result<(), ComfyError> {
        let response = self
            .client
            .post(format!("{}/interrupt", self.api_url))
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Ask the server to unload models and free accelerator memory.
    ///
    /// Sends `POST /free`. Used after an out-of-memory failure so the
    /// next attempt starts from a clean slate.
    pub async fn free_memory(&self) -> Result<(), ComfyError> {
        let body = serde_json::json!({
            "unload_models": true,
            "free_memory": true,
        });

        let response = self
            .client
            .post(format!("{}/free", self.api_url))
            .json(&body)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Upload a local image for use as a workflow input.
    ///
    /// Sends a multipart `POST /upload/image` and returns the
    /// server-side filename.
    pub async fn upload_image(&self, path: &std::path::Path) -> Result<UploadResponse, ComfyError> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.png".to_string());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("overwrite", "true");

        let response = self
            .client
            .post(format!("{}/upload/image", self.api_url))
            .multipart(form)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Probe server liveness with a short deadline.
    ///
    /// Sends `GET /system_stats` and returns whether it answered with
    /// a success status within five seconds.
    pub async fn health_check(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/system_stats", self.api_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ComfyError::Api`] with the
    /// status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ComfyError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComfyError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ComfyError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ComfyError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
