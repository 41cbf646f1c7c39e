//! Repository for the `contents` table.

use clipforge_core::types::DbId;
use sqlx::PgPool;

use crate::models::{Content, UpdateContent};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, post_id, script_json, preview_path, video_path, duration_secs, created_at, updated_at";

/// Provides artifact storage per post.
pub struct ContentRepo;

impl ContentRepo {
    /// Insert or update the artifact row for a post.
    ///
    /// Only non-`None` fields in `input` overwrite existing values, so
    /// each pipeline phase can persist its own artifact as it finishes.
    pub async fn upsert(
        pool: &PgPool,
        post_id: DbId,
        input: &UpdateContent,
    ) -> Result<Content, sqlx::Error> {
        let query = format!(
            "INSERT INTO contents (post_id, script_json, preview_path, video_path, duration_secs)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (post_id) DO UPDATE SET
                script_json = COALESCE(EXCLUDED.script_json, contents.script_json),
                preview_path = COALESCE(EXCLUDED.preview_path, contents.preview_path),
                video_path = COALESCE(EXCLUDED.video_path, contents.video_path),
                duration_secs = COALESCE(EXCLUDED.duration_secs, contents.duration_secs),
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Content>(&query)
            .bind(post_id)
            .bind(&input.script_json)
            .bind(&input.preview_path)
            .bind(&input.video_path)
            .bind(input.duration_secs)
            .fetch_one(pool)
            .await
    }

    /// Find the artifact row for a post.
    pub async fn find_by_post(pool: &PgPool, post_id: DbId) -> Result<Option<Content>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM contents WHERE post_id = $1");
        sqlx::query_as::<_, Content>(&query)
            .bind(post_id)
            .fetch_optional(pool)
            .await
    }
}
