//! Scene model: one visual beat of the output video.
//!
//! Scenes are created by planning, enriched by the mode-assignment and
//! prompt phases, and finalized (clip path or removal) by the clip
//! generation engine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Role of a scene within the video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    /// Opening hook.
    Intro,
    /// Body scene paired with a source image.
    ImageText,
    /// Body scene carrying stacked narration lines only.
    TextOnly,
    /// Closing scene.
    Outro,
}

/// How the scene's clip is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// No diffusion job; the encoder renders a static fallback.
    #[default]
    None,
    /// Text-to-video from the scene's prompt.
    TextToVideo,
    /// Image-to-video seeded by the scene's source image.
    ImageToVideo,
}

/// One narration line, optionally paired with pre-synthesized audio.
///
/// `audio == None` means synthesis failed permanently for this line;
/// the encoder substitutes a short silence instead of aborting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationLine {
    pub text: String,
    pub audio: Option<PathBuf>,
}

impl NarrationLine {
    /// A line with no synthesized audio yet.
    pub fn unsynthesized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            audio: None,
        }
    }
}

/// One visual beat of the output video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// Ordinal position within the planned sequence.
    pub index: usize,
    pub kind: SceneKind,
    /// Narration lines spoken over this scene, in order.
    pub lines: Vec<NarrationLine>,
    pub mode: GenerationMode,
    /// Local path of the seed image for image-to-video scenes.
    pub init_image: Option<PathBuf>,
    /// English diffusion prompt, filled by the prompt phase.
    pub prompt: Option<String>,
    /// Produced clip, filled by the clip generation engine.
    pub clip_path: Option<PathBuf>,
    /// Set when all generation tiers were exhausted. A failed scene
    /// must never reach the encoder; it is merged away first.
    pub generation_failed: bool,
}

impl Scene {
    /// Create a scene with the given position, role, and line texts.
    pub fn new(index: usize, kind: SceneKind, texts: Vec<String>) -> Self {
        Self {
            index,
            kind,
            lines: texts.into_iter().map(NarrationLine::unsynthesized).collect(),
            mode: GenerationMode::None,
            init_image: None,
            prompt: None,
            clip_path: None,
            generation_failed: false,
        }
    }

    /// Whether the clip engine should attempt generation for this scene.
    pub fn wants_clip(&self) -> bool {
        self.mode != GenerationMode::None && self.prompt.is_some() && !self.generation_failed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_scene_has_no_mode_or_clip() {
        let scene = Scene::new(0, SceneKind::Intro, vec!["hook".into()]);
        assert_eq!(scene.mode, GenerationMode::None);
        assert!(scene.clip_path.is_none());
        assert!(!scene.wants_clip());
    }

    #[test]
    fn wants_clip_requires_mode_and_prompt() {
        let mut scene = Scene::new(1, SceneKind::TextOnly, vec!["line".into()]);
        scene.mode = GenerationMode::TextToVideo;
        assert!(!scene.wants_clip());

        scene.prompt = Some("a quiet street".into());
        assert!(scene.wants_clip());

        scene.generation_failed = true;
        assert!(!scene.wants_clip());
    }
}
