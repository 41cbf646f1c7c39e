//! HTTP client for the Ollama-style generation API.

use std::time::Duration;

use serde::Deserialize;

use crate::error::LlmError;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a single text-generation server and model.
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl LlmClient {
    /// * `base_url` - e.g. `http://host:11434`.
    /// * `model`    - model name as known to the server.
    pub fn new(base_url: String, model: String, request_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url,
            model,
        }
    }

    /// Model name this client generates with.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one non-streaming generation.
    pub async fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        self.request(serde_json::json!({
            "model": self.model,
            "system": system,
            "prompt": prompt,
            "stream": false,
        }))
        .await
    }

    /// Run one generation with the server's JSON output constraint and
    /// deserialize the result.
    pub async fn generate_json<T: serde::de::DeserializeOwned>(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<T, LlmError> {
        let raw = self
            .request(serde_json::json!({
                "model": self.model,
                "system": system,
                "prompt": prompt,
                "stream": false,
                "format": "json",
            }))
            .await?;

        let cleaned = extract_json(&raw);
        serde_json::from_str(cleaned)
            .map_err(|e| LlmError::Malformed(format!("invalid JSON from model: {e}; got {raw:?}")))
    }

    /// Unload the model from accelerator memory.
    ///
    /// A generation with `keep_alive: 0` and an empty prompt makes the
    /// server evict the model immediately. Failures are logged, not
    /// returned; the arbiter treats the memory as freed either way.
    pub async fn unload(&self) {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": "",
            "stream": false,
            "keep_alive": 0,
        });
        let result = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {
                tracing::info!(model = %self.model, "Language model unloaded");
            }
            Ok(response) => {
                tracing::warn!(model = %self.model, status = %response.status(), "Unload request rejected");
            }
            Err(e) => {
                tracing::warn!(model = %self.model, error = %e, "Unload request failed");
            }
        }
    }

    /// Probe server liveness with a short deadline.
    pub async fn health_check(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await;
        match result {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn request(&self, body: serde_json::Value) -> Result<String, LlmError> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<GenerateResponse>().await?.response)
    }
}

/// Trim markdown fences and anything outside the outermost JSON value.
///
/// Models wrap JSON in ```` ```json ```` fences or lead with prose even
/// when asked not to.
pub fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    let start = trimmed.find(['{', '[']);
    let end = trimmed.rfind(['}', ']']);
    match (start, end) {
        (Some(start), Some(end)) if end >= start => &trimmed[start..=end],
        _ => trimmed,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
