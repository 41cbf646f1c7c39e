//! Prompt construction for the video diffusion model.
//!
//! The diffusion model wants short English prompts; scene text is
//! whatever language the source post was written in. The engine builds
//! the system/user prompt pairs for translating scene text into a
//! visual prompt, for describing motion on top of a source image, and
//! for the degradation ladder's simplification step, plus the cleanup
//! applied to whatever the model returns.

/// System prompt for text-to-video scenes.
const T2V_SYSTEM: &str = "\
You write prompts for a text-to-video diffusion model. Given narration \
text and a mood, answer with one English prompt of at most 60 words \
describing a single concrete visual: subject, setting, camera movement, \
lighting. No people's faces in close-up, no text overlays, no lists, no \
explanations. Answer with the prompt only.";

/// System prompt for image-to-video scenes.
const I2V_SYSTEM: &str = "\
You write prompts for an image-to-video diffusion model. The model \
animates an existing photo. Given narration text and a mood, answer \
with one English prompt of at most 40 words describing subtle, \
plausible motion for the photo: camera drift, ambient movement, \
lighting change. Do not invent new objects. Answer with the prompt only.";

/// Word budget for mechanically shortened prompts.
const SHORTENED_PROMPT_WORDS: usize = 12;

/// Read-only post context threaded into every prompt request, so a
/// scene's visual stays anchored to the whole story rather than one
/// narration fragment.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    /// Post title.
    pub title: &'a str,
    /// Emotional register from the script.
    pub mood: &'a str,
    /// Truncated body text.
    pub summary: &'a str,
}

/// Builds prompt pairs for the generation model.
///
/// Stateless; methods return `(system, user)` tuples for
/// [`crate::LlmClient::generate`].
#[derive(Debug, Default, Clone)]
pub struct PromptEngine;

impl PromptEngine {
    pub fn new() -> Self {
        Self
    }

    /// Prompt pair for a text-to-video scene.
    pub fn text_to_video(&self, scene_text: &str, ctx: &PromptContext<'_>) -> (&'static str, String) {
        (
            T2V_SYSTEM,
            format!(
                "Title: {title}\nMood: {mood}\nStory: {summary}\nNarration:\n{scene_text}",
                title = ctx.title,
                mood = ctx.mood,
                summary = ctx.summary,
            ),
        )
    }

    /// Prompt pair for an image-to-video scene.
    pub fn image_to_video(&self, scene_text: &str, ctx: &PromptContext<'_>) -> (&'static str, String) {
        (
            I2V_SYSTEM,
            format!(
                "Title: {title}\nMood: {mood}\nStory: {summary}\nNarration over the photo:\n{scene_text}",
                title = ctx.title,
                mood = ctx.mood,
                summary = ctx.summary,
            ),
        )
    }

    /// Mechanically shorten a diffusion prompt for a degraded retry.
    ///
    /// Keeps leading comma-separated clauses while the word budget
    /// holds, so the subject and camera instruction survive and the
    /// trailing style detail is dropped. Runs without the language
    /// model, which is unloaded by the time the ladder needs this.
    pub fn shorten_prompt(&self, prompt: &str) -> String {
        let mut kept: Vec<&str> = Vec::new();
        let mut words = 0;
        for clause in prompt.split(',').map(str::trim) {
            let clause_words = clause.split_whitespace().count();
            if !kept.is_empty() && words + clause_words > SHORTENED_PROMPT_WORDS {
                break;
            }
            words += clause_words;
            kept.push(clause);
        }
        let shortened = kept.join(", ");
        if words > SHORTENED_PROMPT_WORDS {
            // A single overlong clause still gets hard-capped.
            shortened
                .split_whitespace()
                .take(SHORTENED_PROMPT_WORDS)
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            shortened
        }
    }

    /// Normalize a model answer into a usable diffusion prompt.
    ///
    /// Strips code fences, a leading `Prompt:` label, surrounding
    /// quotes, and collapses whitespace into single spaces.
    pub fn clean_prompt(&self, raw: &str) -> String {
        let mut text = raw.trim();
        if let Some(stripped) = text.strip_prefix("```") {
            // Drop the fence line (which may carry a language tag) and
            // the closing fence.
            text = stripped
                .split_once('\n')
                .map(|(_, rest)| rest)
                .unwrap_or(stripped);
            text = text.strip_suffix("```").unwrap_or(text).trim();
        }
        for label in ["Prompt:", "prompt:", "PROMPT:"] {
            if let Some(stripped) = text.strip_prefix(label) {
                text = stripped.trim();
            }
        }
        let text = text.trim_matches(|c| c == '"' || c == '\'' || c == '\u{201c}' || c == '\u{201d}');
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_prompt_strips_quotes_and_label() {
        let engine = PromptEngine::new();
        assert_eq!(
            engine.clean_prompt("Prompt: \"a foggy harbor at dawn, slow pan\""),
            "a foggy harbor at dawn, slow pan"
        );
    }

    #[test]
    fn clean_prompt_strips_code_fence() {
        let engine = PromptEngine::new();
        let raw = "```text\na red bicycle leaning on a wall\n```";
        assert_eq!(engine.clean_prompt(raw), "a red bicycle leaning on a wall");
    }

    #[test]
    fn clean_prompt_collapses_whitespace() {
        let engine = PromptEngine::new();
        assert_eq!(
            engine.clean_prompt("  wide   shot,\n  rain falling  "),
            "wide shot, rain falling"
        );
    }

    #[test]
    fn shorten_keeps_leading_clauses() {
        let engine = PromptEngine::new();
        let prompt = "a red bicycle leaning on a brick wall, slow dolly in, \
                      golden hour light, film grain, depth of field";
        assert_eq!(
            engine.shorten_prompt(prompt),
            "a red bicycle leaning on a brick wall, slow dolly in"
        );
    }

    #[test]
    fn shorten_hard_caps_a_single_long_clause() {
        let engine = PromptEngine::new();
        let prompt = "one clause with far too many words going on and on and on without any commas";
        assert_eq!(engine.shorten_prompt(prompt).split_whitespace().count(), 12);
    }

    #[test]
    fn shorten_leaves_short_prompts_alone() {
        let engine = PromptEngine::new();
        assert_eq!(engine.shorten_prompt("a quiet street"), "a quiet street");
    }

    #[test]
    fn prompt_pairs_embed_context_and_text() {
        let engine = PromptEngine::new();
        let ctx = PromptContext {
            title: "rainy alley story",
            mood: "calm",
            summary: "someone walks home in the rain",
        };
        let (system, user) = engine.text_to_video("골목길에 비가 온다", &ctx);
        assert!(system.contains("text-to-video"));
        assert!(user.contains("rainy alley story"));
        assert!(user.contains("calm"));
        assert!(user.contains("walks home"));
        assert!(user.contains("골목길"));
    }
}
