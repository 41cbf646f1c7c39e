//! Mode assignment: decide how each scene's clip gets generated.
//!
//! Image scenes whose source image is large enough are animated from
//! the image; small or unreadable images fall back to pure
//! text-to-video. Intro and outro stay static. A per-post cap bounds
//! how many scenes get clips at all, since each clip costs minutes of
//! accelerator time.

use clipforge_core::scene::{GenerationMode, Scene, SceneKind};

/// Mode assignment parameters, from worker config.
#[derive(Debug, Clone, Copy)]
pub struct ModeConfig {
    /// Minimum shorter-edge size for image-to-video eligibility.
    pub i2v_min_edge: u32,
    /// Maximum clips generated per post.
    pub clip_cap: usize,
}

/// Assign generation modes in place. Returns the number of scenes
/// that will get a clip.
pub fn assign_modes(scenes: &mut [Scene], config: &ModeConfig) -> usize {
    let mut planned = 0;
    for scene in scenes.iter_mut() {
        if planned >= config.clip_cap {
            break;
        }
        let mode = match scene.kind {
            SceneKind::Intro | SceneKind::Outro => GenerationMode::None,
            SceneKind::ImageText => match &scene.init_image {
                Some(path) => match image::image_dimensions(path) {
                    Ok((width, height)) if width.min(height) >= config.i2v_min_edge => {
                        GenerationMode::ImageToVideo
                    }
                    Ok((width, height)) => {
                        tracing::debug!(
                            scene = scene.index,
                            width,
                            height,
                            min_edge = config.i2v_min_edge,
                            "Image too small to animate, using text-to-video",
                        );
                        GenerationMode::TextToVideo
                    }
                    Err(e) => {
                        tracing::warn!(
                            scene = scene.index,
                            path = %path.display(),
                            error = %e,
                            "Cannot read image header, using text-to-video",
                        );
                        GenerationMode::TextToVideo
                    }
                },
                None => GenerationMode::TextToVideo,
            },
            SceneKind::TextOnly => GenerationMode::TextToVideo,
        };
        if mode != GenerationMode::None {
            planned += 1;
        }
        scene.mode = mode;
    }
    tracing::debug!(planned, cap = config.clip_cap, "Generation modes assigned");
    planned
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scene(index: usize, kind: SceneKind, image: Option<PathBuf>) -> Scene {
        let mut scene = Scene::new(index, kind, vec!["line".into()]);
        scene.init_image = image;
        scene
    }

    fn write_png(dir: &std::path::Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let img = image::RgbImage::new(width, height);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn large_image_becomes_image_to_video() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "big.png", 640, 480);
        let mut scenes = vec![scene(0, SceneKind::ImageText, Some(path))];
        assign_modes(&mut scenes, &ModeConfig { i2v_min_edge: 400, clip_cap: 10 });
        assert_eq!(scenes[0].mode, GenerationMode::ImageToVideo);
    }

    #[test]
    fn small_image_falls_back_to_text_to_video() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "small.png", 200, 150);
        let mut scenes = vec![scene(0, SceneKind::ImageText, Some(path))];
        assign_modes(&mut scenes, &ModeConfig { i2v_min_edge: 400, clip_cap: 10 });
        assert_eq!(scenes[0].mode, GenerationMode::TextToVideo);
    }

    #[test]
    fn unreadable_image_falls_back_to_text_to_video() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.png");
        let mut scenes = vec![scene(0, SceneKind::ImageText, Some(path))];
        assign_modes(&mut scenes, &ModeConfig { i2v_min_edge: 400, clip_cap: 10 });
        assert_eq!(scenes[0].mode, GenerationMode::TextToVideo);
    }

    #[test]
    fn intro_and_outro_stay_static() {
        let mut scenes = vec![
            scene(0, SceneKind::Intro, None),
            scene(1, SceneKind::TextOnly, None),
            scene(2, SceneKind::Outro, None),
        ];
        let planned = assign_modes(&mut scenes, &ModeConfig { i2v_min_edge: 400, clip_cap: 10 });
        assert_eq!(planned, 1);
        assert_eq!(scenes[0].mode, GenerationMode::None);
        assert_eq!(scenes[2].mode, GenerationMode::None);
    }

    #[test]
    fn clip_cap_limits_planned_scenes() {
        let mut scenes: Vec<_> = (0..6)
            .map(|i| scene(i, SceneKind::TextOnly, None))
            .collect();
        let planned = assign_modes(&mut scenes, &ModeConfig { i2v_min_edge: 400, clip_cap: 3 });
        assert_eq!(planned, 3);
        let with_mode = scenes
            .iter()
            .filter(|s| s.mode != GenerationMode::None)
            .count();
        assert_eq!(with_mode, 3);
    }
}
