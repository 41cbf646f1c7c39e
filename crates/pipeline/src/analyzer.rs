//! Resource analysis: pick a chunking strategy from the post's shape.
//!
//! Posts with many images relative to their text get one line per
//! scene so every image is seen; text-heavy posts stack more lines per
//! scene to keep the video short.

use serde::{Deserialize, Serialize};

/// Rough characters-per-sentence estimate for the source language.
const CHARS_PER_SENTENCE: usize = 25;

/// Image-to-sentence ratio thresholds.
const IMAGE_HEAVY_RATIO: f64 = 0.7;
const BALANCED_RATIO: f64 = 0.3;

/// How the script should be chunked and scenes stacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    /// Nearly every sentence has an image; one line per scene.
    ImageHeavy,
    /// Mixed post; up to two lines per text-only scene.
    Balanced,
    /// Mostly text; up to three lines per text-only scene.
    TextHeavy,
}

impl ChunkStrategy {
    /// Maximum narration lines stacked on one text-only scene.
    pub fn stack_limit(&self) -> usize {
        match self {
            Self::ImageHeavy => 1,
            Self::Balanced => 2,
            Self::TextHeavy => 3,
        }
    }
}

/// Shape summary of a post, input to chunking and planning.
#[derive(Debug, Clone, Copy)]
pub struct ResourceProfile {
    pub strategy: ChunkStrategy,
    pub estimated_sentences: usize,
    pub image_count: usize,
}

/// Analyze a post's body and image count.
pub fn analyze(body_text: &str, image_count: usize) -> ResourceProfile {
    let estimated_sentences = (body_text.chars().count() / CHARS_PER_SENTENCE).max(1);
    let ratio = image_count as f64 / estimated_sentences as f64;
    let strategy = if ratio >= IMAGE_HEAVY_RATIO {
        ChunkStrategy::ImageHeavy
    } else if ratio >= BALANCED_RATIO {
        ChunkStrategy::Balanced
    } else {
        ChunkStrategy::TextHeavy
    };

    tracing::debug!(
        estimated_sentences,
        image_count,
        ratio,
        strategy = ?strategy,
        "Post analyzed",
    );

    ResourceProfile {
        strategy,
        estimated_sentences,
        image_count,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn many_images_short_text_is_image_heavy() {
        // 100 chars -> 4 estimated sentences; 4 images -> ratio 1.0.
        let profile = analyze(&"a".repeat(100), 4);
        assert_eq!(profile.strategy, ChunkStrategy::ImageHeavy);
        assert_eq!(profile.estimated_sentences, 4);
    }

    #[test]
    fn mixed_post_is_balanced() {
        // 250 chars -> 10 sentences; 4 images -> ratio 0.4.
        let profile = analyze(&"a".repeat(250), 4);
        assert_eq!(profile.strategy, ChunkStrategy::Balanced);
    }

    #[test]
    fn wall_of_text_is_text_heavy() {
        let profile = analyze(&"a".repeat(1000), 2);
        assert_eq!(profile.strategy, ChunkStrategy::TextHeavy);
    }

    #[test]
    fn no_images_is_text_heavy() {
        let profile = analyze("short post", 0);
        assert_eq!(profile.strategy, ChunkStrategy::TextHeavy);
    }

    #[test]
    fn empty_body_still_has_one_sentence() {
        let profile = analyze("", 1);
        assert_eq!(profile.estimated_sentences, 1);
        assert_eq!(profile.strategy, ChunkStrategy::ImageHeavy);
    }

    #[test]
    fn stack_limits_per_strategy() {
        assert_eq!(ChunkStrategy::ImageHeavy.stack_limit(), 1);
        assert_eq!(ChunkStrategy::Balanced.stack_limit(), 2);
        assert_eq!(ChunkStrategy::TextHeavy.stack_limit(), 3);
    }
}
