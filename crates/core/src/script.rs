//! Structured narration script produced by the chunking phase.
//!
//! A script is a hook line, a list of body blocks (each pre-split into
//! lines that fit the on-screen character budget), and a closer, plus
//! presentation metadata (suggested title, tags, mood).

use serde::{Deserialize, Serialize};

/// One block of the script body.
///
/// A block groups the lines of a single spoken sentence; comment
/// blocks quote a reader reaction and are voiced differently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptBlock {
    /// Display lines, each within the per-line character budget.
    pub lines: Vec<String>,
    /// `"comment"` for quoted reactions; absent for normal narration.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "type")]
    pub kind: Option<String>,
}

impl ScriptBlock {
    /// A plain narration block.
    pub fn narration(lines: Vec<String>) -> Self {
        Self { lines, kind: None }
    }
}

/// A complete narration script for one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Attention hook spoken in the first seconds.
    pub hook: String,
    /// Main narration, in reading order.
    pub body: Vec<ScriptBlock>,
    /// Closing line.
    pub closer: String,
    /// Suggested upload title.
    #[serde(default)]
    pub title_suggestion: String,
    /// Suggested upload tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Emotional register of the source post, drives voice and visual
    /// style selection.
    #[serde(default = "default_mood")]
    pub mood: String,
}

fn default_mood() -> String {
    "daily".to_string()
}

impl Script {
    /// All narration lines flattened in reading order: hook, body
    /// lines, closer. Empty strings are skipped.
    pub fn all_lines(&self) -> Vec<&str> {
        let mut lines = Vec::new();
        if !self.hook.is_empty() {
            lines.push(self.hook.as_str());
        }
        for block in &self.body {
            lines.extend(block.lines.iter().map(String::as_str));
        }
        if !self.closer.is_empty() {
            lines.push(self.closer.as_str());
        }
        lines
    }

    /// Body text joined into a single string, truncated to `max_chars`,
    /// used as read-only context for prompt generation.
    pub fn body_summary(&self, max_chars: usize) -> String {
        let joined = self
            .body
            .iter()
            .flat_map(|b| b.lines.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        joined.chars().take(max_chars).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
