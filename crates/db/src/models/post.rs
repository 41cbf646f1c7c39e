//! Row model for the `posts` table.

use clipforge_core::error::CoreError;
use clipforge_core::status::PostStatus;
use clipforge_core::types::{DbId, Timestamp};
use serde::Serialize;

/// One collected post, the unit of work for the pipeline.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: DbId,
    /// Source platform identifier, e.g. `community_board`.
    pub source: String,
    pub source_url: Option<String>,
    pub title: String,
    /// Full post text, paragraphs separated by blank lines.
    pub body_text: String,
    /// Local paths of downloaded post images, in document order.
    pub image_paths: Vec<String>,
    /// Stable string form of [`PostStatus`].
    pub status: String,
    /// Times the post has been claimed for processing.
    pub retry_count: i32,
    /// Error text from the last failed run.
    pub failure_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Post {
    /// Parse the stored status string.
    pub fn status(&self) -> Result<PostStatus, CoreError> {
        self.status.parse()
    }
}
