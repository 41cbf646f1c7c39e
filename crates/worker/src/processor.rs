//! Post processor: the glue between the queue and the pipeline.
//!
//! One processor claims one post at a time. A successful run writes
//! the artifacts and moves the post to `PREVIEW_RENDERED`; a pipeline
//! failure records its reason and moves the post to `FAILED`, where it
//! stays until an operator requeues it.

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::PgPool;

use clipforge_core::arbiter::VramArbiter;
use clipforge_core::error::CoreError;
use clipforge_core::status::PostStatus;
use clipforge_core::types::DbId;
use clipforge_comfyui::ComfyClient;
use clipforge_db::models::{Post, UpdateContent};
use clipforge_db::repositories::{ContentRepo, PostRepo};
use clipforge_llm::LlmClient;
use clipforge_pipeline::{Orchestrator, PipelineConfig, PipelineInput, PipelineOutput};
use clipforge_tts::TtsClient;

use crate::config::WorkerConfig;

/// Error type for worker operations. Pipeline failures are not errors
/// here: they are recorded on the post and the worker moves on.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub struct Processor {
    pool: PgPool,
    llm: LlmClient,
    tts: TtsClient,
    comfy: ComfyClient,
    arbiter: Arc<VramArbiter>,
    pipeline_config: PipelineConfig,
    max_retries: i32,
}

impl Processor {
    pub fn new(pool: PgPool, config: &WorkerConfig) -> Self {
        let llm = LlmClient::new(
            config.llm_url.clone(),
            config.llm_model.clone(),
            std::time::Duration::from_secs(120),
        );
        let tts = TtsClient::new(
            config.tts_url.clone(),
            config.tts_voice.clone(),
            std::time::Duration::from_secs(60),
        );
        let comfy = ComfyClient::new(config.comfy_config());
        Self {
            pool,
            llm,
            tts,
            comfy,
            arbiter: Arc::new(VramArbiter::new(config.vram_budget_mb)),
            pipeline_config: config.pipeline_config(),
            max_retries: config.max_retries,
        }
    }

    /// Claim and process the oldest approved post. Returns `None` when
    /// the queue is empty.
    pub async fn process_next(&self) -> Result<Option<DbId>, WorkerError> {
        let Some(post) = PostRepo::claim_next_approved(&self.pool).await? else {
            return Ok(None);
        };
        let post_id = post.id;
        tracing::info!(
            post_id,
            attempt = post.retry_count,
            title = %post.title,
            "Claimed post",
        );

        let input = PipelineInput {
            post_id,
            title: post.title.clone(),
            body_text: post.body_text.clone(),
            image_paths: post.image_paths.iter().map(PathBuf::from).collect(),
        };
        let orchestrator = Orchestrator::new(
            &self.llm,
            &self.tts,
            &self.comfy,
            self.arbiter.clone(),
            self.pipeline_config.clone(),
        );

        match orchestrator.run(&input).await {
            Ok(output) => self.record_success(&post, output).await?,
            Err(e) => {
                tracing::error!(post_id, error = %e, "Pipeline failed");
                PostRepo::mark_failed(&self.pool, post_id, &e.to_string()).await?;
            }
        }
        Ok(Some(post_id))
    }

    /// Move failed posts with attempts left back into the queue.
    /// Backs the `requeue` command; the poll loop never calls this.
    pub async fn requeue_failed(&self) -> Result<u64, WorkerError> {
        let requeued = PostRepo::requeue_failed(&self.pool, self.max_retries).await?;
        if requeued > 0 {
            tracing::info!(requeued, "Requeued failed posts");
        }
        Ok(requeued)
    }

    async fn record_success(
        &self,
        post: &Post,
        output: PipelineOutput,
    ) -> Result<(), WorkerError> {
        let update = UpdateContent {
            script_json: serde_json::to_value(&output.script).ok(),
            preview_path: Some(output.video_path.to_string_lossy().into_owned()),
            video_path: None,
            duration_secs: output.duration_secs,
        };
        ContentRepo::upsert(&self.pool, post.id, &update).await?;

        let next = post.status()?.transition_to(PostStatus::PreviewRendered)?;
        PostRepo::update_status(&self.pool, post.id, next).await?;
        tracing::info!(
            post_id = post.id,
            video = %output.video_path.display(),
            duration_secs = output.duration_secs,
            silent_lines = output.silent_lines,
            merged_scenes = output.merged_scenes,
            "Post processed",
        );
        Ok(())
    }
}
