//! High-level generation client.
//!
//! [`ComfyClient`] turns a [`GenerationRequest`] into a finished clip
//! file: load and patch the workflow template, upload the seed image
//! if any, submit, await completion (push with polling fallback), then
//! resolve the output file on the shared mount and wait for the server
//! to finish writing it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;

use crate::api::ComfyApi;
use crate::awaiter::{PollAwaiter, PushAwaiter, ResultAwaiter};
use crate::error::ComfyError;
use crate::workflow::{apply_patch, WorkflowPatch, WorkflowTemplates};

/// Output list keys checked in the history, most specific first.
const OUTPUT_KEYS: &[&str] = &["gifs", "videos", "images"];

/// How long a produced file's size must hold steady before it is
/// considered fully written.
const FILE_STABLE_INTERVAL: Duration = Duration::from_secs(1);
const FILE_STABLE_MAX_CHECKS: u32 = 30;

/// Connection and filesystem configuration for one generation server.
#[derive(Debug, Clone)]
pub struct ComfyClientConfig {
    /// Base HTTP URL, e.g. `http://host:8188`.
    pub api_url: String,
    /// Base WebSocket URL, e.g. `ws://host:8188`.
    pub ws_url: String,
    /// Directory holding workflow template JSON files.
    pub templates_dir: PathBuf,
    /// Mount point where the server's output directory is visible
    /// locally.
    pub output_mount: PathBuf,
    /// History polling interval for the fallback awaiter.
    pub poll_interval: Duration,
}

/// One clip generation job.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Workflow template file stem, e.g. `t2v` or `i2v_distilled`.
    pub template: String,
    pub positive_prompt: String,
    pub negative_prompt: String,
    /// Local seed image for image-to-video workflows.
    pub init_image: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub num_frames: u32,
    pub steps: u32,
    pub cfg: f64,
    /// Fixed seed for reproduction; random when absent.
    pub seed: Option<u64>,
    /// Wall-clock budget for the whole generation.
    pub timeout: Duration,
}

/// Client for a single generation server.
pub struct ComfyClient {
    api: ComfyApi,
    ws_url: String,
    templates: WorkflowTemplates,
    output_mount: PathBuf,
    poll_interval: Duration,
}

impl ComfyClient {
    pub fn new(config: ComfyClientConfig) -> Self {
        Self {
            api: ComfyApi::new(config.api_url),
            ws_url: config.ws_url,
            templates: WorkflowTemplates::new(config.templates_dir),
            output_mount: config.output_mount,
            poll_interval: config.poll_interval,
        }
    }

    /// Probe server liveness.
    pub async fn health_check(&self) -> bool {
        self.api.health_check().await
    }

    /// Ask the server to unload models and free accelerator memory.
    pub async fn free_memory(&self) -> Result<(), ComfyError> {
        self.api.free_memory().await
    }

    /// Run one generation end to end, returning the local path of the
    /// produced clip.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<PathBuf, ComfyError> {
        let mut workflow = self.templates.load(&request.template).await?;
        let patch = self.build_patch(request).await?;
        let report = apply_patch(&mut workflow, &patch);
        if !report.unapplied.is_empty() {
            tracing::warn!(
                template = %request.template,
                unapplied = ?report.unapplied,
                "Patch entries matched nothing in the workflow template",
            );
        }

        // Push messages are preferred, but a refused WebSocket must not
        // fail the generation while the HTTP API is still up.
        // The submission must carry the same client id the socket was
        // opened with, or no push messages arrive for it.
        let (mut awaiter, client_id): (Box<dyn ResultAwaiter>, String) =
            match PushAwaiter::connect(&self.ws_url, self.api.clone(), self.poll_interval).await {
                Ok(push) => {
                    let client_id = push.client_id().to_string();
                    (Box::new(push), client_id)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "WebSocket unavailable, polling for completion");
                    (
                        Box::new(PollAwaiter::new(self.api.clone(), self.poll_interval)),
                        uuid::Uuid::new_v4().to_string(),
                    )
                }
            };

        let submit = self.api.submit_workflow(&workflow, &client_id).await?;
        tracing::info!(
            prompt_id = %submit.prompt_id,
            queue_position = submit.number,
            template = %request.template,
            "Workflow submitted",
        );

        let seconds = request.timeout.as_secs();
        match tokio::time::timeout(request.timeout, awaiter.await_completion(&submit.prompt_id))
            .await
        {
            Ok(outcome) => outcome?,
            Err(_) => {
                // Stop the server-side job so the next attempt starts clean.
                if let Err(e) = self.api.interrupt().await {
                    tracing::warn!(prompt_id = %submit.prompt_id, error = %e, "Interrupt after timeout failed");
                }
                return Err(ComfyError::Timeout { seconds });
            }
        }

        let history = self.api.get_history(&submit.prompt_id).await?;
        let relative = resolve_output(&history, &submit.prompt_id).ok_or_else(|| {
            ComfyError::OutputMissing(format!(
                "history for prompt {} lists no output file",
                submit.prompt_id
            ))
        })?;
        let path = self.output_mount.join(relative);
        wait_for_stable_file(&path, FILE_STABLE_INTERVAL, FILE_STABLE_MAX_CHECKS).await?;

        tracing::info!(prompt_id = %submit.prompt_id, path = %path.display(), "Clip ready");
        Ok(path)
    }

    /// Build the patch for a request, uploading the seed image first.
    async fn build_patch(&self, request: &GenerationRequest) -> Result<WorkflowPatch, ComfyError> {
        let mut patch = WorkflowPatch::default();
        patch
            .inputs
            .insert("width".into(), request.width.into());
        patch
            .inputs
            .insert("height".into(), request.height.into());
        patch
            .inputs
            .insert("length".into(), request.num_frames.into());
        patch
            .inputs
            .insert("steps".into(), request.steps.into());
        patch.inputs.insert("cfg".into(), request.cfg.into());
        let seed = request
            .seed
            .unwrap_or_else(|| rand::rng().random_range(0..u32::MAX as u64));
        patch.inputs.insert("seed".into(), seed.into());

        patch
            .placeholders
            .insert("positive_prompt".into(), request.positive_prompt.clone());
        patch
            .placeholders
            .insert("negative_prompt".into(), request.negative_prompt.clone());

        if let Some(image) = &request.init_image {
            let uploaded = self.api.upload_image(image).await?;
            let reference = if uploaded.subfolder.is_empty() {
                uploaded.name
            } else {
                format!("{}/{}", uploaded.subfolder, uploaded.name)
            };
            patch.placeholders.insert("init_image".into(), reference);
        }
        Ok(patch)
    }
}

/// Find the first output file in a history response, relative to the
/// server's output directory.
pub fn resolve_output(history: &serde_json::Value, prompt_id: &str) -> Option<PathBuf> {
    let outputs = history.get(prompt_id)?.get("outputs")?.as_object()?;
    for key in OUTPUT_KEYS {
        for node_output in outputs.values() {
            let Some(files) = node_output.get(*key).and_then(|v| v.as_array()) else {
                continue;
            };
            if let Some(file) = files.first() {
                let filename = file.get("filename")?.as_str()?;
                let subfolder = file
                    .get("subfolder")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                let mut path = PathBuf::new();
                if !subfolder.is_empty() {
                    path.push(subfolder);
                }
                path.push(filename);
                return Some(path);
            }
        }
    }
    None
}

/// Wait until the file exists, is non-empty, and its size stops
/// changing between checks.
///
/// The server writes outputs to a shared mount, so the file can appear
/// before the encoder has finished flushing it.
pub async fn wait_for_stable_file(
    path: &Path,
    interval: Duration,
    max_checks: u32,
) -> Result<(), ComfyError> {
    let mut last_size: Option<u64> = None;
    for _ in 0..max_checks {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.len() > 0 => {
                if last_size == Some(meta.len()) {
                    return Ok(());
                }
                last_size = Some(meta.len());
            }
            _ => {}
        }
        tokio::time::sleep(interval).await;
    }
    Err(ComfyError::OutputMissing(format!(
        "file {} never stabilized",
        path.display()
    )))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
