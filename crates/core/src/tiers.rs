//! Generation quality ladder.
//!
//! Each clip gets up to four attempts, each cheaper than the last:
//!
//! 1. full resolution, original prompt
//! 2. full resolution, simplified prompt
//! 3. fallback resolution and frame count, fewer sampling steps
//! 4. fallback resolution with the distilled model variant
//!
//! A scene that fails tier 4 is marked failed and later merged into a
//! neighboring scene instead of aborting the whole video.

use serde::{Deserialize, Serialize};

/// Number of attempts before a scene is given up on.
pub const MAX_GENERATION_TIERS: u32 = 4;

/// Geometry and sampling configuration, usually loaded from the
/// environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    /// Output size for tiers 1 and 2.
    pub full_width: u32,
    pub full_height: u32,
    /// Output size for tiers 3 and 4.
    pub fallback_width: u32,
    pub fallback_height: u32,
    /// Frame count for tiers 1 and 2.
    pub full_frames: u32,
    /// Frame count for tiers 3 and 4.
    pub fallback_frames: u32,
    /// Sampling steps for tiers 1 and 2.
    pub full_steps: u32,
    /// Sampling steps for tier 3.
    pub reduced_steps: u32,
    /// Sampling steps for the distilled model in tier 4.
    pub distilled_steps: u32,
    /// Guidance scale for tiers 1 through 3.
    pub full_cfg: f64,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            full_width: 1280,
            full_height: 720,
            fallback_width: 768,
            fallback_height: 512,
            full_frames: 97,
            fallback_frames: 65,
            full_steps: 20,
            reduced_steps: 15,
            // The distilled variant needs very few steps and ignores
            // guidance, so cfg is pinned to 1.0 in tier 4.
            distilled_steps: 8,
            full_cfg: 3.5,
        }
    }
}

/// Resolved parameters for a single generation attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct TierParams {
    pub width: u32,
    pub height: u32,
    pub num_frames: u32,
    pub steps: u32,
    pub cfg: f64,
    /// Use the distilled model variant's workflow.
    pub distilled: bool,
    /// Ask the prompt engine for a simplified prompt first.
    pub shorten_prompt: bool,
}

/// Parameters for the given 1-based attempt.
///
/// Attempts past [`MAX_GENERATION_TIERS`] clamp to the last tier; the
/// caller is expected to stop there.
pub fn tier_params(attempt: u32, config: &TierConfig) -> TierParams {
    match attempt {
        0 | 1 => TierParams {
            width: config.full_width,
            height: config.full_height,
            num_frames: config.full_frames,
            steps: config.full_steps,
            cfg: config.full_cfg,
            distilled: false,
            shorten_prompt: false,
        },
        2 => TierParams {
            width: config.full_width,
            height: config.full_height,
            num_frames: config.full_frames,
            steps: config.full_steps,
            cfg: config.full_cfg,
            distilled: false,
            shorten_prompt: true,
        },
        3 => TierParams {
            width: config.fallback_width,
            height: config.fallback_height,
            num_frames: config.fallback_frames,
            steps: config.reduced_steps,
            cfg: config.full_cfg,
            distilled: false,
            shorten_prompt: true,
        },
        _ => TierParams {
            width: config.fallback_width,
            height: config.fallback_height,
            num_frames: config.fallback_frames,
            steps: config.distilled_steps,
            cfg: 1.0,
            distilled: true,
            shorten_prompt: true,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
