//! Phase orchestrator: one approved post in, one preview video out.
//!
//! Phases run strictly in order; everything up to clip generation is
//! either fatal (chunking, planning) or degrades the item in a bounded
//! way (silent lines, demoted scenes, merged scenes). Accelerator
//! memory is arbitrated per act: the text model is held for chunking
//! and prompt generation, the speech model for narration, and the
//! video model only after the text model has been explicitly unloaded.

use std::path::PathBuf;
use std::sync::Arc;

use clipforge_core::arbiter::VramArbiter;
use clipforge_core::merge::merge_failed_scenes;
use clipforge_core::retry::RetryPolicy;
use clipforge_core::scene::Scene;
use clipforge_core::script::Script;
use clipforge_core::splitting::validate_script;
use clipforge_core::types::DbId;
use clipforge_llm::{PromptContext, PromptEngine};

use crate::analyzer;
use crate::chunker;
use crate::clip_engine::{self, ClipEngineConfig};
use crate::director;
use crate::encoder::{Encoder, EncoderConfig};
use crate::error::{Phase, PipelineError};
use crate::modes::{self, ModeConfig};
use crate::narration;
use crate::prompts;
use crate::services::{ClipGenerator, SpeechSynthesizer, TextGenerator};

/// Body-summary budget for the prompt context, in characters.
const SUMMARY_CHARS: usize = 300;

/// Everything the pipeline needs to know that is not per-post.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub retry: RetryPolicy,
    pub modes: ModeConfig,
    pub clip_engine: ClipEngineConfig,
    pub encoder: EncoderConfig,
    /// Narration line length ceiling, in characters.
    pub max_line_chars: usize,
    /// Hook length ceiling, in characters.
    pub max_hook_chars: usize,
    pub text_model_cost_mb: u64,
    pub speech_model_cost_mb: u64,
    pub video_model_cost_mb: u64,
    /// Root for per-post intermediate files.
    pub work_dir: PathBuf,
    /// Where finished previews land.
    pub output_dir: PathBuf,
}

/// Per-post input, lifted off the claimed row.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    pub post_id: DbId,
    pub title: String,
    pub body_text: String,
    pub image_paths: Vec<PathBuf>,
}

/// Result of a full run.
#[derive(Debug)]
pub struct PipelineOutput {
    pub video_path: PathBuf,
    pub script: Script,
    pub duration_secs: Option<f64>,
    /// Lines rendered as silence.
    pub silent_lines: usize,
    /// Scenes absorbed by the failed-scene merge.
    pub merged_scenes: usize,
}

pub struct Orchestrator<'a> {
    llm: &'a dyn TextGenerator,
    tts: &'a dyn SpeechSynthesizer,
    clip: &'a dyn ClipGenerator,
    arbiter: Arc<VramArbiter>,
    config: PipelineConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        llm: &'a dyn TextGenerator,
        tts: &'a dyn SpeechSynthesizer,
        clip: &'a dyn ClipGenerator,
        arbiter: Arc<VramArbiter>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            llm,
            tts,
            clip,
            arbiter,
            config,
        }
    }

    /// Run the whole pipeline for one post.
    pub async fn run(&self, input: &PipelineInput) -> Result<PipelineOutput, PipelineError> {
        let (script, scenes, silent_lines, merged_scenes) = self.prepare_scenes(input).await?;

        let work_dir = self.post_work_dir(input.post_id);
        let output_path = self
            .config
            .output_dir
            .join(format!("post_{}.mp4", input.post_id));

        let result = Encoder::new(self.config.encoder.clone())
            .encode(&scenes, &work_dir, &output_path)
            .await
            .map_err(|e| PipelineError::new(Phase::Encoding, e))?;

        Ok(PipelineOutput {
            video_path: result.video_path,
            script,
            duration_secs: result.duration_secs,
            silent_lines,
            merged_scenes,
        })
    }

    /// All phases up to and including the failed-scene merge. Returns
    /// the validated script, the encodable scenes, and degradation
    /// counts.
    pub(crate) async fn prepare_scenes(
        &self,
        input: &PipelineInput,
    ) -> Result<(Script, Vec<Scene>, usize, usize), PipelineError> {
        tracing::info!(post_id = input.post_id, title = %input.title, "Pipeline starting");

        let profile = analyzer::analyze(&input.body_text, input.image_paths.len());
        tracing::info!(post_id = input.post_id, profile = ?profile, "Resource profile");

        // Text act, part one: chunking under the text-model ticket.
        let script = {
            let _ticket = self
                .arbiter
                .acquire("text-model", self.config.text_model_cost_mb)
                .map_err(|e| PipelineError::new(Phase::Chunking, e))?;
            let mut script =
                chunker::chunk(self.llm, &input.title, &input.body_text, &profile).await?;
            validate_script(
                &mut script,
                self.config.max_line_chars,
                self.config.max_hook_chars,
            );
            script
        };

        let mut scenes = director::plan_scenes(&script, &input.image_paths, profile.strategy);
        if scenes.is_empty() {
            return Err(PipelineError::new(
                Phase::ScenePlanning,
                "script produced no scenes",
            ));
        }

        let planned = modes::assign_modes(&mut scenes, &self.config.modes);
        tracing::info!(post_id = input.post_id, scenes = scenes.len(), planned, "Scenes planned");

        // Speech act.
        let report = {
            let _ticket = self
                .arbiter
                .acquire("speech-model", self.config.speech_model_cost_mb)
                .map_err(|e| PipelineError::new(Phase::Narration, e))?;
            let audio_dir = self.post_work_dir(input.post_id).join("audio");
            narration::synthesize_all(&mut scenes, self.tts, self.config.retry, &audio_dir).await?
        };

        // Text act, part two: video prompts, still on the text model.
        let engine = PromptEngine::new();
        {
            let _ticket = self
                .arbiter
                .acquire("text-model", self.config.text_model_cost_mb)
                .map_err(|e| PipelineError::new(Phase::Prompts, e))?;
            let summary = script.body_summary(SUMMARY_CHARS);
            let ctx = PromptContext {
                title: &input.title,
                mood: &script.mood,
                summary: &summary,
            };
            let demoted = prompts::generate_prompts(
                &mut scenes,
                self.llm,
                &engine,
                &ctx,
                self.config.retry,
            )
            .await;
            if demoted > 0 {
                tracing::warn!(post_id = input.post_id, demoted, "Scenes demoted to static");
            }
        }

        // Hand the accelerator over to the video model.
        self.llm.unload().await;

        let outcomes = {
            let _ticket = self
                .arbiter
                .acquire("video-model", self.config.video_model_cost_mb)
                .map_err(|e| PipelineError::new(Phase::ClipGeneration, e))?;
            clip_engine::generate_all(
                &mut scenes,
                self.clip,
                &engine,
                &self.arbiter,
                &self.config.clip_engine,
            )
            .await
        };
        let failed = outcomes.iter().filter(|o| !o.succeeded).count();

        let before = scenes.len();
        let scenes = merge_failed_scenes(scenes);
        if scenes.is_empty() {
            return Err(PipelineError::new(
                Phase::ClipGeneration,
                "every scene failed clip generation",
            ));
        }
        let merged_scenes = before - scenes.len();
        if failed > 0 {
            tracing::warn!(
                post_id = input.post_id,
                failed,
                merged_scenes,
                "Failed scenes merged into survivors",
            );
        }

        Ok((script, scenes, report.silent, merged_scenes))
    }

    fn post_work_dir(&self, post_id: DbId) -> PathBuf {
        self.config.work_dir.join(format!("post_{post_id}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
