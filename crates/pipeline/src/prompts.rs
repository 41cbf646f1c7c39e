//! Prompt generation: one diffusion prompt per clip-bearing scene.
//!
//! A scene whose prompt generation fails permanently is demoted to
//! `GenerationMode::None` and rendered as a static segment by the
//! encoder, rather than failing the item or sending an empty prompt
//! to the diffusion model.

use clipforge_core::retry::{with_retry, RetryPolicy};
use clipforge_core::scene::{GenerationMode, Scene};
use clipforge_llm::{PromptContext, PromptEngine};

use crate::services::TextGenerator;

/// Generate prompts for every scene that wants a clip. Returns the
/// number of scenes demoted to static.
pub async fn generate_prompts(
    scenes: &mut [Scene],
    llm: &dyn TextGenerator,
    engine: &PromptEngine,
    ctx: &PromptContext<'_>,
    policy: RetryPolicy,
) -> usize {
    let mut demoted = 0;

    for scene in scenes.iter_mut() {
        if scene.mode == GenerationMode::None {
            continue;
        }
        let scene_text = scene
            .lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let (system, user) = match scene.mode {
            GenerationMode::ImageToVideo => engine.image_to_video(&scene_text, ctx),
            _ => engine.text_to_video(&scene_text, ctx),
        };

        let result = with_retry(policy, |_| true, |_| llm.generate(system, &user)).await;

        match result.map(|raw| engine.clean_prompt(&raw)) {
            Ok(prompt) if !prompt.is_empty() => {
                tracing::debug!(scene = scene.index, prompt = %prompt, "Prompt generated");
                scene.prompt = Some(prompt);
            }
            Ok(_) => {
                tracing::warn!(scene = scene.index, "Model returned an empty prompt, demoting scene");
                scene.mode = GenerationMode::None;
                demoted += 1;
            }
            Err(e) => {
                tracing::warn!(
                    scene = scene.index,
                    error = %e,
                    "Prompt generation failed, demoting scene to static",
                );
                scene.mode = GenerationMode::None;
                demoted += 1;
            }
        }
    }
    demoted
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clipforge_core::scene::SceneKind;
    use clipforge_llm::LlmError;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers with a quoted prompt, or fails when the user prompt
    /// mentions "broken". Records every user prompt it sees.
    #[derive(Default)]
    struct FakeLlm {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for FakeLlm {
        async fn generate(&self, _system: &str, prompt: &str) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push(prompt.to_string());
            if prompt.contains("broken") {
                Err(LlmError::Malformed("no answer".into()))
            } else {
                Ok("\"a quiet street at dusk, slow pan\"".to_string())
            }
        }

        async fn generate_json_value(
            &self,
            _system: &str,
            _prompt: &str,
        ) -> Result<serde_json::Value, LlmError> {
            Ok(serde_json::Value::Null)
        }

        async fn unload(&self) {}

        async fn health_check(&self) -> bool {
            true
        }
    }

    fn scene_with_mode(index: usize, text: &str, mode: GenerationMode) -> Scene {
        let mut scene = Scene::new(index, SceneKind::TextOnly, vec![text.into()]);
        scene.mode = mode;
        scene
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(2, Duration::from_millis(1), 2.0)
    }

    fn ctx() -> PromptContext<'static> {
        PromptContext {
            title: "a walk home",
            mood: "daily",
            summary: "walking home through the alley after work",
        }
    }

    #[tokio::test(start_paused = true)]
    async fn prompts_are_cleaned_and_stored() {
        let mut scenes = vec![scene_with_mode(0, "text", GenerationMode::TextToVideo)];
        let llm = FakeLlm::default();
        let demoted =
            generate_prompts(&mut scenes, &llm, &PromptEngine::new(), &ctx(), policy()).await;
        assert_eq!(demoted, 0);
        assert_eq!(
            scenes[0].prompt.as_deref(),
            Some("a quiet street at dusk, slow pan")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn post_context_reaches_the_model() {
        let mut scenes = vec![scene_with_mode(0, "scene text", GenerationMode::TextToVideo)];
        let llm = FakeLlm::default();
        generate_prompts(&mut scenes, &llm, &PromptEngine::new(), &ctx(), policy()).await;
        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("a walk home"));
        assert!(seen[0].contains("through the alley"));
        assert!(seen[0].contains("scene text"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_prompt_demotes_the_scene() {
        let mut scenes = vec![
            scene_with_mode(0, "fine", GenerationMode::TextToVideo),
            scene_with_mode(1, "broken scene", GenerationMode::TextToVideo),
        ];
        let llm = FakeLlm::default();
        let demoted =
            generate_prompts(&mut scenes, &llm, &PromptEngine::new(), &ctx(), policy()).await;
        assert_eq!(demoted, 1);
        assert_eq!(scenes[1].mode, GenerationMode::None);
        assert!(scenes[1].prompt.is_none());
        assert!(scenes[0].wants_clip());
    }

    #[tokio::test(start_paused = true)]
    async fn static_scenes_are_skipped() {
        let mut scenes = vec![scene_with_mode(0, "intro", GenerationMode::None)];
        let llm = FakeLlm::default();
        generate_prompts(&mut scenes, &llm, &PromptEngine::new(), &ctx(), policy()).await;
        assert!(scenes[0].prompt.is_none());
    }
}
