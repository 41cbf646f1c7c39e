//! Rescue of scenes whose clip generation failed every tier.
//!
//! Narration must survive even when visuals do not. Each failed
//! scene's lines are folded into the nearest surviving neighbor:
//! appended to the closest preceding survivor, or, for failures at the
//! head of the sequence, prepended to the closest following one. The
//! failed scenes are then removed and the rest re-indexed, so the
//! encoder only ever sees scenes it can render.

use crate::scene::Scene;

/// Fold failed scenes into their neighbors and drop them.
///
/// Reading order of narration is preserved exactly. Returns an empty
/// vector when every scene failed; the caller treats that as a fatal
/// pipeline error.
pub fn merge_failed_scenes(mut scenes: Vec<Scene>) -> Vec<Scene> {
    if scenes.iter().all(|s| s.generation_failed) {
        return Vec::new();
    }

    let mut append_plans = Vec::new();
    let mut prepend_plans = Vec::new();
    for i in 0..scenes.len() {
        if !scenes[i].generation_failed {
            continue;
        }
        if let Some(target) = (0..i).rev().find(|&j| !scenes[j].generation_failed) {
            append_plans.push((i, target));
        } else if let Some(target) = (i + 1..scenes.len()).find(|&j| !scenes[j].generation_failed)
        {
            prepend_plans.push((i, target));
        }
    }

    // Appends run head to tail so consecutive failures land on their
    // shared survivor in reading order.
    for &(failed, target) in &append_plans {
        let lines = scenes[failed].lines.clone();
        scenes[target].lines.extend(lines);
    }
    // Prepends run tail to head for the same reason.
    for &(failed, target) in prepend_plans.iter().rev() {
        let lines = scenes[failed].lines.clone();
        scenes[target].lines.splice(0..0, lines);
    }

    scenes.retain(|s| !s.generation_failed);
    for (index, scene) in scenes.iter_mut().enumerate() {
        scene.index = index;
    }
    scenes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneKind;

    fn scene(index: usize, line: &str, failed: bool) -> Scene {
        let mut scene = Scene::new(index, SceneKind::TextOnly, vec![line.to_string()]);
        scene.generation_failed = failed;
        scene
    }

    fn line_texts(scene: &Scene) -> Vec<&str> {
        scene.lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn no_failures_leaves_scenes_untouched() {
        let scenes = vec![scene(0, "a", false), scene(1, "b", false)];
        let merged = merge_failed_scenes(scenes.clone());
        assert_eq!(merged, scenes);
    }

    #[test]
    fn failed_middle_scenes_append_to_preceding_survivor() {
        let scenes = vec![
            scene(0, "intro", false),
            scene(1, "body one", false),
            scene(2, "body two", true),
            scene(3, "body three", true),
            scene(4, "outro", false),
        ];
        let merged = merge_failed_scenes(scenes);
        assert_eq!(merged.len(), 3);
        assert_eq!(
            line_texts(&merged[1]),
            vec!["body one", "body two", "body three"]
        );
        assert_eq!(line_texts(&merged[2]), vec!["outro"]);
    }

    #[test]
    fn failed_head_scenes_prepend_to_following_survivor() {
        let scenes = vec![
            scene(0, "first", true),
            scene(1, "second", true),
            scene(2, "third", false),
        ];
        let merged = merge_failed_scenes(scenes);
        assert_eq!(merged.len(), 1);
        assert_eq!(line_texts(&merged[0]), vec!["first", "second", "third"]);
    }

    #[test]
    fn survivors_are_reindexed() {
        let scenes = vec![
            scene(0, "a", false),
            scene(1, "b", true),
            scene(2, "c", false),
        ];
        let merged = merge_failed_scenes(scenes);
        let indexes: Vec<_> = merged.iter().map(|s| s.index).collect();
        assert_eq!(indexes, vec![0, 1]);
    }

    #[test]
    fn all_failed_yields_empty() {
        let scenes = vec![scene(0, "a", true), scene(1, "b", true)];
        assert!(merge_failed_scenes(scenes).is_empty());
    }

    #[test]
    fn narration_is_conserved() {
        let scenes = vec![
            scene(0, "a", true),
            scene(1, "b", false),
            scene(2, "c", true),
            scene(3, "d", false),
            scene(4, "e", true),
        ];
        let merged = merge_failed_scenes(scenes);
        let all: Vec<_> = merged.iter().flat_map(line_texts).collect();
        assert_eq!(all, vec!["a", "b", "c", "d", "e"]);
    }
}
