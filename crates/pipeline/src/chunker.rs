//! Script chunking: turn the raw post into a structured script.
//!
//! One JSON-mode generation produces the whole script (hook, body
//! blocks, closer, metadata). The strategy from the analyzer shapes
//! the instructions: image-heavy posts ask for one short sentence per
//! block, text-heavy posts allow longer blocks.

use clipforge_core::script::Script;

use crate::analyzer::ResourceProfile;
use crate::error::{Phase, PipelineError};
use crate::services::TextGenerator;

const CHUNK_SYSTEM: &str = "\
You turn an online community post into a short-form video narration \
script. Answer with JSON only, in the shape {\"hook\": string, \"body\": \
[{\"lines\": [string], \"type\": \"comment\"?}], \"closer\": string, \
\"title_suggestion\": string, \"tags\": [string], \"mood\": string}. The \
hook is one attention-grabbing sentence. Each body block is one spoken \
sentence, split into short display lines. Quote reader reactions as \
blocks with type \"comment\". mood is one of: daily, shock, touching, \
funny, anger. Keep the original language of the post.";

/// Generate a script from the post text.
///
/// A failure here is fatal for the item: there is no narration to
/// salvage yet.
pub async fn chunk(
    llm: &dyn TextGenerator,
    title: &str,
    body_text: &str,
    profile: &ResourceProfile,
) -> Result<Script, PipelineError> {
    let shape_hint = match profile.strategy {
        crate::analyzer::ChunkStrategy::ImageHeavy => {
            "The post is image-driven: write one very short sentence per body block, \
             one block per image moment."
        }
        crate::analyzer::ChunkStrategy::Balanced => {
            "Balance narration and visuals: short sentences, one thought per block."
        }
        crate::analyzer::ChunkStrategy::TextHeavy => {
            "The post is text-driven: condense aggressively, keep only the strongest beats."
        }
    };

    let user = format!(
        "{shape_hint}\n\nTitle: {title}\n\nPost:\n{body_text}\n\n\
         Aim for roughly {sentences} body blocks.",
        sentences = profile.estimated_sentences.clamp(4, 12),
    );

    let value = llm
        .generate_json_value(CHUNK_SYSTEM, &user)
        .await
        .map_err(|e| PipelineError::new(Phase::Chunking, e))?;

    let script: Script = serde_json::from_value(value)
        .map_err(|e| PipelineError::new(Phase::Chunking, format!("script JSON malformed: {e}")))?;

    if script.hook.trim().is_empty() || script.body.is_empty() {
        return Err(PipelineError::new(
            Phase::Chunking,
            "model produced an empty script",
        ));
    }

    tracing::info!(
        blocks = script.body.len(),
        mood = %script.mood,
        "Script generated",
    );
    Ok(script)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use async_trait::async_trait;
    use clipforge_llm::LlmError;
    use serde_json::json;

    struct FakeLlm {
        reply: serde_json::Value,
    }

    #[async_trait]
    impl TextGenerator for FakeLlm {
        async fn generate(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
            Ok(String::new())
        }

        async fn generate_json_value(
            &self,
            _system: &str,
            _prompt: &str,
        ) -> Result<serde_json::Value, LlmError> {
            Ok(self.reply.clone())
        }

        async fn unload(&self) {}

        async fn health_check(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn valid_reply_parses_into_a_script() {
        let llm = FakeLlm {
            reply: json!({
                "hook": "You won't believe this",
                "body": [{"lines": ["It started small"]}],
                "closer": "What would you do?",
                "title_suggestion": "A wild day",
                "tags": ["story"],
                "mood": "shock"
            }),
        };
        let profile = analyze("some body text for the post", 1);
        let script = chunk(&llm, "title", "body", &profile).await.unwrap();
        assert_eq!(script.hook, "You won't believe this");
        assert_eq!(script.mood, "shock");
    }

    #[tokio::test]
    async fn empty_script_is_a_chunking_failure() {
        let llm = FakeLlm {
            reply: json!({"hook": "", "body": [], "closer": ""}),
        };
        let profile = analyze("text", 0);
        let err = chunk(&llm, "t", "b", &profile).await.unwrap_err();
        assert_eq!(err.phase, Phase::Chunking);
    }

    #[tokio::test]
    async fn malformed_json_is_a_chunking_failure() {
        let llm = FakeLlm {
            reply: json!({"completely": "wrong"}),
        };
        let profile = analyze("text", 0);
        let err = chunk(&llm, "t", "b", &profile).await.unwrap_err();
        assert_eq!(err.phase, Phase::Chunking);
    }
}
