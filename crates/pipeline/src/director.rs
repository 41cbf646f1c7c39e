//! Scene planning: lay the validated script out as a scene sequence.
//!
//! Shape: intro (hook) → body scenes → outro (closer). Body lines are
//! paired with post images first, one line per image scene; leftover
//! lines are stacked onto text-only scenes up to the strategy's stack
//! limit. The last post image is reserved for the outro when the post
//! has more than one.

use std::path::PathBuf;

use clipforge_core::scene::{Scene, SceneKind};
use clipforge_core::script::Script;

use crate::analyzer::ChunkStrategy;

/// Plan the scene sequence for a script.
pub fn plan_scenes(script: &Script, image_paths: &[PathBuf], strategy: ChunkStrategy) -> Vec<Scene> {
    let mut scenes = Vec::new();
    let mut index = 0;

    let mut push = |scenes: &mut Vec<Scene>, kind, lines: Vec<String>, image: Option<PathBuf>| {
        let mut scene = Scene::new(index, kind, lines);
        scene.init_image = image;
        scenes.push(scene);
        index += 1;
    };

    if !script.hook.trim().is_empty() {
        push(&mut scenes, SceneKind::Intro, vec![script.hook.clone()], None);
    }

    // Reserve the last image for the outro when there is more than one.
    let (body_images, outro_image) = if image_paths.len() >= 2 {
        let (body, last) = image_paths.split_at(image_paths.len() - 1);
        (body, last.first().cloned())
    } else {
        (image_paths, None)
    };

    let mut lines: std::collections::VecDeque<String> = script
        .body
        .iter()
        .flat_map(|block| block.lines.iter().cloned())
        .collect();

    // Image scenes carry one line each so every image gets its moment.
    for image in body_images {
        let Some(line) = lines.pop_front() else { break };
        push(
            &mut scenes,
            SceneKind::ImageText,
            vec![line],
            Some(image.clone()),
        );
    }

    // Leftover lines stack onto text-only scenes.
    let limit = strategy.stack_limit();
    while !lines.is_empty() {
        // The closing beats stay light even for text-heavy posts.
        let effective = if lines.len() <= 2 { limit.min(2) } else { limit };
        let mut stack = Vec::new();
        while stack.len() < effective {
            let Some(line) = lines.pop_front() else { break };
            let emphatic = line.trim_end().ends_with(['?', '!']);
            stack.push(line);
            // An emphatic line closes its scene for impact.
            if emphatic {
                break;
            }
        }
        push(&mut scenes, SceneKind::TextOnly, stack, None);
    }

    if !script.closer.trim().is_empty() {
        push(
            &mut scenes,
            SceneKind::Outro,
            vec![script.closer.clone()],
            outro_image,
        );
    }

    tracing::debug!(
        scenes = scenes.len(),
        images = image_paths.len(),
        strategy = ?strategy,
        "Scenes planned",
    );
    scenes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_core::script::ScriptBlock;

    fn script(body_lines: &[&str]) -> Script {
        Script {
            hook: "the hook".into(),
            body: vec![ScriptBlock::narration(
                body_lines.iter().map(|l| l.to_string()).collect(),
            )],
            closer: "the closer".into(),
            title_suggestion: String::new(),
            tags: vec![],
            mood: "daily".into(),
        }
    }

    fn images(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("img_{i}.jpg"))).collect()
    }

    #[test]
    fn intro_body_outro_shape() {
        let scenes = plan_scenes(&script(&["a", "b"]), &[], ChunkStrategy::Balanced);
        assert_eq!(scenes.first().map(|s| s.kind), Some(SceneKind::Intro));
        assert_eq!(scenes.last().map(|s| s.kind), Some(SceneKind::Outro));
        assert_eq!(scenes.len(), 3);
        assert_eq!(scenes[1].lines.len(), 2);
    }

    #[test]
    fn images_pair_one_line_each() {
        let scenes = plan_scenes(
            &script(&["a", "b", "c"]),
            &images(3),
            ChunkStrategy::ImageHeavy,
        );
        // intro, two image scenes (third image reserved for outro),
        // one text-only leftover, outro.
        let kinds: Vec<_> = scenes.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SceneKind::Intro,
                SceneKind::ImageText,
                SceneKind::ImageText,
                SceneKind::TextOnly,
                SceneKind::Outro,
            ]
        );
        assert!(scenes[1].init_image.is_some());
        assert_eq!(scenes.last().unwrap().init_image, Some(PathBuf::from("img_2.jpg")));
    }

    #[test]
    fn single_image_is_not_stolen_by_the_outro() {
        let scenes = plan_scenes(&script(&["a"]), &images(1), ChunkStrategy::Balanced);
        assert_eq!(scenes[1].kind, SceneKind::ImageText);
        assert!(scenes.last().unwrap().init_image.is_none());
    }

    #[test]
    fn text_heavy_stacks_three_lines() {
        let scenes = plan_scenes(
            &script(&["a", "b", "c", "d", "e"]),
            &[],
            ChunkStrategy::TextHeavy,
        );
        // 5 lines: a stack of 3, then the final 2 stay together.
        assert_eq!(scenes[1].lines.len(), 3);
        assert_eq!(scenes[2].lines.len(), 2);
    }

    #[test]
    fn emphatic_line_closes_its_scene() {
        let scenes = plan_scenes(
            &script(&["calm line", "what happened next?!", "more", "and more", "even more"]),
            &[],
            ChunkStrategy::TextHeavy,
        );
        // The question mark cuts the first stack at two lines.
        assert_eq!(scenes[1].lines.len(), 2);
        assert_eq!(scenes[1].lines[1].text, "what happened next?!");
    }

    #[test]
    fn indices_are_sequential() {
        let scenes = plan_scenes(&script(&["a", "b", "c"]), &images(2), ChunkStrategy::Balanced);
        for (i, scene) in scenes.iter().enumerate() {
            assert_eq!(scene.index, i);
        }
    }
}
