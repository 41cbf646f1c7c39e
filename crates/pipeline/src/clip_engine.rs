//! Clip generation engine: the degradation ladder.
//!
//! Scenes are processed strictly in index order, one generation in
//! flight at a time. Each scene gets up to four attempts, each cheaper
//! than the last (see `clipforge_core::tiers`). A timeout burns a tier
//! like any other failure. When the remote error text looks like
//! memory exhaustion, the engine forces a remote model unload and
//! clears the arbiter before the next attempt. A scene that exhausts
//! the ladder is flagged failed and later merged away; its failure
//! never crosses to other scenes.

use std::sync::Arc;
use std::time::Duration;

use clipforge_core::arbiter::VramArbiter;
use clipforge_core::error::{classify_failure, FailureKind};
use clipforge_core::scene::{GenerationMode, Scene};
use clipforge_core::tiers::{tier_params, TierConfig, MAX_GENERATION_TIERS};
use clipforge_comfyui::GenerationRequest;
use clipforge_llm::PromptEngine;

use crate::services::ClipGenerator;

/// Engine parameters, from worker config.
#[derive(Debug, Clone)]
pub struct ClipEngineConfig {
    pub tiers: TierConfig,
    /// Wall-clock budget for a single generation attempt.
    pub attempt_timeout: Duration,
    pub negative_prompt: String,
    /// Workflow template stems per mode and model variant.
    pub t2v_template: String,
    pub i2v_template: String,
    pub t2v_distilled_template: String,
    pub i2v_distilled_template: String,
}

/// Per-scene result summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipOutcome {
    pub scene_index: usize,
    /// Attempts consumed, 1 through 4.
    pub attempts: u32,
    pub succeeded: bool,
}

/// Generate clips for all eligible scenes.
///
/// If the generation service fails its liveness probe the whole phase
/// is skipped and scenes are left untouched; the encoder will render
/// static segments.
pub async fn generate_all(
    scenes: &mut [Scene],
    clip: &dyn ClipGenerator,
    engine: &PromptEngine,
    arbiter: &Arc<VramArbiter>,
    config: &ClipEngineConfig,
) -> Vec<ClipOutcome> {
    if !clip.health_check().await {
        tracing::warn!("Generation service is down, skipping the clip phase entirely");
        return Vec::new();
    }

    let mut outcomes = Vec::new();
    for scene in scenes.iter_mut() {
        if !scene.wants_clip() {
            continue;
        }
        let outcome = generate_scene(scene, clip, engine, arbiter, config).await;
        outcomes.push(outcome);
    }
    outcomes
}

/// Run the ladder for one scene.
async fn generate_scene(
    scene: &mut Scene,
    clip: &dyn ClipGenerator,
    engine: &PromptEngine,
    arbiter: &Arc<VramArbiter>,
    config: &ClipEngineConfig,
) -> ClipOutcome {
    // wants_clip() guarantees the prompt is present.
    let original_prompt = scene.prompt.clone().unwrap_or_default();

    for attempt in 1..=MAX_GENERATION_TIERS {
        let params = tier_params(attempt, &config.tiers);
        let prompt = if params.shorten_prompt {
            engine.shorten_prompt(&original_prompt)
        } else {
            original_prompt.clone()
        };
        let request = build_request(scene, &prompt, &params, config);

        tracing::info!(
            scene = scene.index,
            attempt,
            width = params.width,
            height = params.height,
            steps = params.steps,
            distilled = params.distilled,
            "Generating clip",
        );

        match clip.generate(&request).await {
            Ok(path) => {
                tracing::info!(scene = scene.index, attempt, path = %path.display(), "Clip generated");
                scene.clip_path = Some(path);
                return ClipOutcome {
                    scene_index: scene.index,
                    attempts: attempt,
                    succeeded: true,
                };
            }
            Err(e) => {
                let kind = classify_failure(&e.to_string());
                tracing::warn!(
                    scene = scene.index,
                    attempt,
                    error = %e,
                    kind = ?kind,
                    "Clip attempt failed",
                );
                if kind == FailureKind::ResourceExhaustion {
                    tracing::warn!(scene = scene.index, "Memory pressure reported, forcing a clear");
                    if let Err(free_err) = clip.free_memory().await {
                        tracing::warn!(error = %free_err, "Remote memory free failed");
                    }
                    arbiter.force_clear();
                }
            }
        }
    }

    scene.generation_failed = true;
    tracing::error!(scene = scene.index, "All generation tiers exhausted, scene flagged for merge");
    ClipOutcome {
        scene_index: scene.index,
        attempts: MAX_GENERATION_TIERS,
        succeeded: false,
    }
}

fn build_request(
    scene: &Scene,
    prompt: &str,
    params: &clipforge_core::tiers::TierParams,
    config: &ClipEngineConfig,
) -> GenerationRequest {
    let image_to_video = scene.mode == GenerationMode::ImageToVideo;
    let template = match (image_to_video, params.distilled) {
        (false, false) => &config.t2v_template,
        (false, true) => &config.t2v_distilled_template,
        (true, false) => &config.i2v_template,
        (true, true) => &config.i2v_distilled_template,
    };
    GenerationRequest {
        template: template.clone(),
        positive_prompt: prompt.to_string(),
        negative_prompt: config.negative_prompt.clone(),
        init_image: if image_to_video {
            scene.init_image.clone()
        } else {
            None
        },
        width: params.width,
        height: params.height,
        num_frames: params.num_frames,
        steps: params.steps,
        cfg: params.cfg,
        seed: None,
        timeout: config.attempt_timeout,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clipforge_comfyui::error::ComfyError;
    use clipforge_core::scene::SceneKind;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted generator: pops one pre-programmed result per call and
    /// records every request it sees.
    struct ScriptedClip {
        healthy: bool,
        results: Mutex<VecDeque<Result<PathBuf, ComfyError>>>,
        requests: Mutex<Vec<GenerationRequest>>,
        frees: AtomicUsize,
    }

    impl ScriptedClip {
        fn new(results: Vec<Result<PathBuf, ComfyError>>) -> Self {
            Self {
                healthy: true,
                results: Mutex::new(results.into()),
                requests: Mutex::new(Vec::new()),
                frees: AtomicUsize::new(0),
            }
        }

        fn requests(&self) -> Vec<GenerationRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ClipGenerator for ScriptedClip {
        async fn generate(&self, request: &GenerationRequest) -> Result<PathBuf, ComfyError> {
            self.requests.lock().unwrap().push(request.clone());
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ComfyError::Remote("script exhausted".into())))
        }

        async fn free_memory(&self) -> Result<(), ComfyError> {
            self.frees.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn health_check(&self) -> bool {
            self.healthy
        }
    }

    fn config() -> ClipEngineConfig {
        ClipEngineConfig {
            tiers: TierConfig::default(),
            attempt_timeout: Duration::from_secs(300),
            negative_prompt: "blurry, watermark".into(),
            t2v_template: "t2v".into(),
            i2v_template: "i2v".into(),
            t2v_distilled_template: "t2v_distilled".into(),
            i2v_distilled_template: "i2v_distilled".into(),
        }
    }

    fn ready_scene(index: usize, mode: GenerationMode) -> Scene {
        let mut scene = Scene::new(index, SceneKind::TextOnly, vec!["line".into()]);
        scene.mode = mode;
        scene.prompt = Some(
            "a red bicycle leaning on a brick wall, slow dolly in, golden hour light".into(),
        );
        scene
    }

    fn remote_err(message: &str) -> Result<PathBuf, ComfyError> {
        Err(ComfyError::Remote(message.into()))
    }

    fn arbiter() -> Arc<VramArbiter> {
        Arc::new(VramArbiter::new(20_000))
    }

    #[tokio::test]
    async fn first_tier_success_stops_the_ladder() {
        let clip = ScriptedClip::new(vec![Ok(PathBuf::from("/out/clip.mp4"))]);
        let mut scenes = vec![ready_scene(0, GenerationMode::TextToVideo)];
        let outcomes =
            generate_all(&mut scenes, &clip, &PromptEngine::new(), &arbiter(), &config()).await;

        assert_eq!(outcomes, vec![ClipOutcome { scene_index: 0, attempts: 1, succeeded: true }]);
        assert_eq!(scenes[0].clip_path, Some(PathBuf::from("/out/clip.mp4")));
        let requests = clip.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].template, "t2v");
        assert_eq!(requests[0].width, 1280);
        assert!(requests[0].positive_prompt.contains("golden hour"));
    }

    #[tokio::test]
    async fn ladder_degrades_prompt_then_geometry_then_model() {
        let clip = ScriptedClip::new(vec![
            remote_err("boom"),
            remote_err("boom"),
            remote_err("boom"),
            Ok(PathBuf::from("/out/clip.mp4")),
        ]);
        let mut scenes = vec![ready_scene(0, GenerationMode::TextToVideo)];
        let outcomes =
            generate_all(&mut scenes, &clip, &PromptEngine::new(), &arbiter(), &config()).await;

        assert!(outcomes[0].succeeded);
        assert_eq!(outcomes[0].attempts, 4);
        let requests = clip.requests();
        // Tier 2 keeps geometry but shortens the prompt.
        assert_eq!(requests[1].width, 1280);
        assert!(!requests[1].positive_prompt.contains("golden hour"));
        // Tier 3 drops geometry and steps.
        assert_eq!((requests[2].width, requests[2].height), (768, 512));
        assert_eq!(requests[2].steps, 15);
        // Tier 4 switches to the distilled template.
        assert_eq!(requests[3].template, "t2v_distilled");
        assert_eq!(requests[3].steps, 8);
        assert_eq!(requests[3].cfg, 1.0);
    }

    #[tokio::test]
    async fn exhausted_ladder_flags_the_scene_and_stops_at_four() {
        let clip = ScriptedClip::new(vec![
            remote_err("a"),
            remote_err("b"),
            remote_err("c"),
            remote_err("d"),
        ]);
        let mut scenes = vec![ready_scene(0, GenerationMode::TextToVideo)];
        let outcomes =
            generate_all(&mut scenes, &clip, &PromptEngine::new(), &arbiter(), &config()).await;

        assert!(!outcomes[0].succeeded);
        assert!(scenes[0].generation_failed);
        assert!(scenes[0].clip_path.is_none());
        assert_eq!(clip.requests().len(), 4);
    }

    #[tokio::test]
    async fn memory_pressure_forces_remote_and_local_clear() {
        let clip = ScriptedClip::new(vec![
            remote_err("CUDA out of memory"),
            Ok(PathBuf::from("/out/clip.mp4")),
        ]);
        let arbiter = arbiter();
        let _held = arbiter.acquire("video-model", 1_000).unwrap();
        let mut scenes = vec![ready_scene(0, GenerationMode::TextToVideo)];

        generate_all(&mut scenes, &clip, &PromptEngine::new(), &arbiter, &config()).await;

        assert_eq!(clip.frees.load(Ordering::SeqCst), 1);
        // The arbiter was force-cleared between attempts.
        assert_eq!(arbiter.active_workloads().len(), 0);
    }

    #[tokio::test]
    async fn timeout_burns_a_tier_without_memory_clear() {
        let clip = ScriptedClip::new(vec![
            Err(ComfyError::Timeout { seconds: 300 }),
            Ok(PathBuf::from("/out/clip.mp4")),
        ]);
        let mut scenes = vec![ready_scene(0, GenerationMode::TextToVideo)];
        let outcomes =
            generate_all(&mut scenes, &clip, &PromptEngine::new(), &arbiter(), &config()).await;

        assert!(outcomes[0].succeeded);
        assert_eq!(outcomes[0].attempts, 2);
        // A timeout is not memory pressure; no remote free is issued.
        assert_eq!(clip.frees.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn service_down_skips_the_phase_without_touching_scenes() {
        let mut clip = ScriptedClip::new(vec![]);
        clip.healthy = false;
        let mut scenes = vec![ready_scene(0, GenerationMode::TextToVideo)];
        let outcomes =
            generate_all(&mut scenes, &clip, &PromptEngine::new(), &arbiter(), &config()).await;

        assert!(outcomes.is_empty());
        assert!(!scenes[0].generation_failed);
        assert!(clip.requests().is_empty());
    }

    #[tokio::test]
    async fn image_scene_carries_its_init_image() {
        let clip = ScriptedClip::new(vec![Ok(PathBuf::from("/out/clip.mp4"))]);
        let mut scene = ready_scene(0, GenerationMode::ImageToVideo);
        scene.init_image = Some(PathBuf::from("/cache/img_0.jpg"));
        let mut scenes = vec![scene];

        generate_all(&mut scenes, &clip, &PromptEngine::new(), &arbiter(), &config()).await;

        let requests = clip.requests();
        assert_eq!(requests[0].template, "i2v");
        assert_eq!(requests[0].init_image, Some(PathBuf::from("/cache/img_0.jpg")));
    }

    #[tokio::test]
    async fn scenes_processed_in_index_order() {
        let clip = ScriptedClip::new(vec![
            Ok(PathBuf::from("/out/a.mp4")),
            Ok(PathBuf::from("/out/b.mp4")),
        ]);
        let mut scenes = vec![
            ready_scene(0, GenerationMode::TextToVideo),
            Scene::new(1, SceneKind::Intro, vec!["static".into()]),
            ready_scene(2, GenerationMode::TextToVideo),
        ];
        let outcomes =
            generate_all(&mut scenes, &clip, &PromptEngine::new(), &arbiter(), &config()).await;

        let order: Vec<_> = outcomes.iter().map(|o| o.scene_index).collect();
        assert_eq!(order, vec![0, 2]);
    }
}
