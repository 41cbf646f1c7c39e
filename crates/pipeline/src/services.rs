//! Service seams for the external AI collaborators.
//!
//! Phases talk to the text, speech, and clip services through these
//! traits so the pipeline can be exercised with scripted fakes. The
//! real clients implement them by delegation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use clipforge_comfyui::error::ComfyError;
use clipforge_comfyui::{ComfyClient, GenerationRequest};
use clipforge_llm::{LlmClient, LlmError};
use clipforge_tts::{TtsClient, TtsError};

/// Text generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
    async fn generate_json_value(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<serde_json::Value, LlmError>;
    /// Evict the model from accelerator memory.
    async fn unload(&self);
    async fn health_check(&self) -> bool;
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        LlmClient::generate(self, system, prompt).await
    }

    async fn generate_json_value(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<serde_json::Value, LlmError> {
        LlmClient::generate_json(self, system, prompt).await
    }

    async fn unload(&self) {
        LlmClient::unload(self).await;
    }

    async fn health_check(&self) -> bool {
        LlmClient::health_check(self).await
    }
}

/// Speech synthesis service.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        line_index: usize,
        out_dir: &Path,
    ) -> Result<PathBuf, TtsError>;
    async fn health_check(&self) -> bool;
}

#[async_trait]
impl SpeechSynthesizer for TtsClient {
    async fn synthesize(
        &self,
        text: &str,
        line_index: usize,
        out_dir: &Path,
    ) -> Result<PathBuf, TtsError> {
        TtsClient::synthesize(self, text, line_index, out_dir).await
    }

    async fn health_check(&self) -> bool {
        TtsClient::health_check(self).await
    }
}

/// Video clip generation service.
#[async_trait]
pub trait ClipGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<PathBuf, ComfyError>;
    /// Ask the remote side to drop loaded models.
    async fn free_memory(&self) -> Result<(), ComfyError>;
    async fn health_check(&self) -> bool;
}

#[async_trait]
impl ClipGenerator for ComfyClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<PathBuf, ComfyError> {
        ComfyClient::generate(self, request).await
    }

    async fn free_memory(&self) -> Result<(), ComfyError> {
        ComfyClient::free_memory(self).await
    }

    async fn health_check(&self) -> bool {
        ComfyClient::health_check(self).await
    }
}
