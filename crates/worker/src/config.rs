//! Worker configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use clipforge_core::retry::RetryPolicy;
use clipforge_core::tiers::TierConfig;
use clipforge_comfyui::ComfyClientConfig;
use clipforge_pipeline::clip_engine::ClipEngineConfig;
use clipforge_pipeline::encoder::EncoderConfig;
use clipforge_pipeline::modes::ModeConfig;
use clipforge_pipeline::PipelineConfig;

/// Worker configuration.
///
/// All fields except `DATABASE_URL` have defaults suitable for a
/// single-GPU development box. In production, override via environment
/// variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Postgres connection string. Required.
    pub database_url: String,

    /// ComfyUI base HTTP URL (default `http://127.0.0.1:8188`).
    pub comfy_api_url: String,
    /// ComfyUI base WebSocket URL (default derived from the HTTP URL).
    pub comfy_ws_url: String,
    /// Directory holding workflow template JSON files.
    pub templates_dir: PathBuf,
    /// Local mount of the ComfyUI output directory.
    pub comfy_output_mount: PathBuf,

    /// Ollama-style LLM base URL (default `http://127.0.0.1:11434`).
    pub llm_url: String,
    /// LLM model name.
    pub llm_model: String,

    /// TTS service base URL (default `http://127.0.0.1:5002`).
    pub tts_url: String,
    /// TTS voice name.
    pub tts_voice: String,

    /// Accelerator memory budget in MB, total minus a safety margin.
    pub vram_budget_mb: u64,
    pub text_model_cost_mb: u64,
    pub speech_model_cost_mb: u64,
    pub video_model_cost_mb: u64,

    /// Seconds between queue polls when the queue is empty.
    pub poll_interval_secs: u64,
    /// Claim attempts per post before it stays failed.
    pub max_retries: i32,

    /// Minimum shorter-edge pixels for image-to-video eligibility.
    pub i2v_min_edge: u32,
    /// Maximum clips generated per post.
    pub clip_cap: usize,
    /// Wall-clock budget for one generation attempt, in seconds.
    pub attempt_timeout_secs: u64,
    pub negative_prompt: String,

    /// Root for per-post intermediate files.
    pub work_dir: PathBuf,
    /// Where finished previews land.
    pub output_dir: PathBuf,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `DATABASE_URL`          | required                   |
    /// | `COMFY_API_URL`         | `http://127.0.0.1:8188`    |
    /// | `COMFY_WS_URL`          | derived from `COMFY_API_URL` |
    /// | `COMFY_TEMPLATES_DIR`   | `./workflows`              |
    /// | `COMFY_OUTPUT_MOUNT`    | `/mnt/comfy/output`        |
    /// | `LLM_URL`               | `http://127.0.0.1:11434`   |
    /// | `LLM_MODEL`             | `qwen2.5:14b`              |
    /// | `TTS_URL`               | `http://127.0.0.1:5002`    |
    /// | `TTS_VOICE`             | `default`                  |
    /// | `VRAM_BUDGET_MB`        | `22000`                    |
    /// | `TEXT_MODEL_COST_MB`    | `10000`                    |
    /// | `SPEECH_MODEL_COST_MB`  | `4000`                     |
    /// | `VIDEO_MODEL_COST_MB`   | `18000`                    |
    /// | `POLL_INTERVAL_SECS`    | `10`                       |
    /// | `MAX_RETRIES`           | `3`                        |
    /// | `I2V_MIN_EDGE`          | `400`                      |
    /// | `CLIP_CAP`              | `8`                        |
    /// | `ATTEMPT_TIMEOUT_SECS`  | `600`                      |
    /// | `NEGATIVE_PROMPT`       | built-in quality list      |
    /// | `WORK_DIR`              | `./work`                   |
    /// | `OUTPUT_DIR`            | `./output`                 |
    pub fn from_env() -> Self {
        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL environment variable is required");

        let comfy_api_url =
            env_or("COMFY_API_URL", "http://127.0.0.1:8188");
        let comfy_ws_url =
            std::env::var("COMFY_WS_URL").unwrap_or_else(|_| derive_ws_url(&comfy_api_url));

        Self {
            database_url,
            comfy_api_url,
            comfy_ws_url,
            templates_dir: env_or("COMFY_TEMPLATES_DIR", "./workflows").into(),
            comfy_output_mount: env_or("COMFY_OUTPUT_MOUNT", "/mnt/comfy/output").into(),
            llm_url: env_or("LLM_URL", "http://127.0.0.1:11434"),
            llm_model: env_or("LLM_MODEL", "qwen2.5:14b"),
            tts_url: env_or("TTS_URL", "http://127.0.0.1:5002"),
            tts_voice: env_or("TTS_VOICE", "default"),
            vram_budget_mb: env_parse("VRAM_BUDGET_MB", 22_000),
            text_model_cost_mb: env_parse("TEXT_MODEL_COST_MB", 10_000),
            speech_model_cost_mb: env_parse("SPEECH_MODEL_COST_MB", 4_000),
            video_model_cost_mb: env_parse("VIDEO_MODEL_COST_MB", 18_000),
            poll_interval_secs: env_parse("POLL_INTERVAL_SECS", 10),
            max_retries: env_parse("MAX_RETRIES", 3),
            i2v_min_edge: env_parse("I2V_MIN_EDGE", 400),
            clip_cap: env_parse("CLIP_CAP", 8),
            attempt_timeout_secs: env_parse("ATTEMPT_TIMEOUT_SECS", 600),
            negative_prompt: env_or(
                "NEGATIVE_PROMPT",
                "blurry, low quality, distorted, watermark, text overlay, jpeg artifacts",
            ),
            work_dir: env_or("WORK_DIR", "./work").into(),
            output_dir: env_or("OUTPUT_DIR", "./output").into(),
        }
    }

    /// Connection config for the generation server.
    pub fn comfy_config(&self) -> ComfyClientConfig {
        ComfyClientConfig {
            api_url: self.comfy_api_url.clone(),
            ws_url: self.comfy_ws_url.clone(),
            templates_dir: self.templates_dir.clone(),
            output_mount: self.comfy_output_mount.clone(),
            poll_interval: Duration::from_secs(3),
        }
    }

    /// Assemble the per-post pipeline configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            retry: RetryPolicy::default(),
            modes: ModeConfig {
                i2v_min_edge: self.i2v_min_edge,
                clip_cap: self.clip_cap,
            },
            clip_engine: ClipEngineConfig {
                tiers: TierConfig::default(),
                attempt_timeout: Duration::from_secs(self.attempt_timeout_secs),
                negative_prompt: self.negative_prompt.clone(),
                t2v_template: "t2v".into(),
                i2v_template: "i2v".into(),
                t2v_distilled_template: "t2v_distilled".into(),
                i2v_distilled_template: "i2v_distilled".into(),
            },
            encoder: EncoderConfig::default(),
            max_line_chars: 80,
            max_hook_chars: 60,
            text_model_cost_mb: self.text_model_cost_mb,
            speech_model_cost_mb: self.speech_model_cost_mb,
            video_model_cost_mb: self.video_model_cost_mb,
            work_dir: self.work_dir.clone(),
            output_dir: self.output_dir.clone(),
        }
    }
}

/// Turn an HTTP base URL into its WebSocket twin.
fn derive_ws_url(api_url: &str) -> String {
    if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        api_url.to_string()
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T
where
    T::Err: std::fmt::Debug,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{key} must parse: {e:?}")),
        Err(_) => default,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_derived_from_http() {
        assert_eq!(derive_ws_url("http://gpu-box:8188"), "ws://gpu-box:8188");
        assert_eq!(derive_ws_url("https://gpu-box:8188"), "wss://gpu-box:8188");
    }

    #[test]
    fn opaque_url_passed_through() {
        assert_eq!(derive_ws_url("unix:///tmp/sock"), "unix:///tmp/sock");
    }
}
