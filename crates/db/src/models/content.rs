//! Row model for the `contents` table.
//!
//! One row per post holding the pipeline's artifacts: the generated
//! script and the rendered video paths.

use clipforge_core::types::{DbId, Timestamp};
use serde::Serialize;

/// Generated artifacts for one post.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Content {
    pub id: DbId,
    pub post_id: DbId,
    /// The narration script as produced by the text act.
    pub script_json: Option<serde_json::Value>,
    /// Low-quality preview render.
    pub preview_path: Option<String>,
    /// Final render.
    pub video_path: Option<String>,
    pub duration_secs: Option<f64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Artifact fields written by the pipeline. Only non-`None` fields are
/// applied.
#[derive(Debug, Clone, Default)]
pub struct UpdateContent {
    pub script_json: Option<serde_json::Value>,
    pub preview_path: Option<String>,
    pub video_path: Option<String>,
    pub duration_secs: Option<f64>,
}
