//! Repository for the `posts` table.

use clipforge_core::status::PostStatus;
use clipforge_core::types::DbId;
use sqlx::PgPool;

use crate::models::Post;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, source, source_url, title, body_text, image_paths, \
    status, retry_count, failure_reason, created_at, updated_at";

/// Provides claim and lifecycle operations for posts.
pub struct PostRepo;

impl PostRepo {
    /// Atomically claim the oldest approved post for processing.
    ///
    /// A single statement moves the row to `PROCESSING` and bumps its
    /// retry counter; `FOR UPDATE SKIP LOCKED` keeps concurrent workers
    /// from claiming the same post. Returns `None` when the queue is
    /// empty.
    pub async fn claim_next_approved(pool: &PgPool) -> Result<Option<Post>, sqlx::Error> {
        let query = format!(
            "UPDATE posts SET
                status = '{processing}',
                retry_count = retry_count + 1,
                updated_at = NOW()
             WHERE id = (
                SELECT id FROM posts
                WHERE status = '{approved}'
                ORDER BY created_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
             )
             RETURNING {COLUMNS}",
            processing = PostStatus::Processing.as_str(),
            approved = PostStatus::Approved.as_str(),
        );
        sqlx::query_as::<_, Post>(&query).fetch_optional(pool).await
    }

    /// Find a post by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Post>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM posts WHERE id = $1");
        sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Set a post's status. Returns `false` if no row was updated.
    ///
    /// Transition legality is checked in the worker before calling
    /// this; the database stores whatever it is told.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: PostStatus,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE posts SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status.as_str())
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move a post to `FAILED` and record the error text.
    pub async fn mark_failed(
        pool: &PgPool,
        id: DbId,
        reason: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE posts SET status = $2, failure_reason = $3, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(PostStatus::Failed.as_str())
        .bind(reason)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Requeue failed posts that still have claim attempts left.
    /// Operator-invoked; failed posts are never requeued automatically.
    ///
    /// Returns the number of posts moved back to `APPROVED`.
    pub async fn requeue_failed(pool: &PgPool, max_retries: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE posts SET
                status = $1,
                failure_reason = NULL,
                updated_at = NOW()
             WHERE status = $2 AND retry_count < $3",
        )
        .bind(PostStatus::Approved.as_str())
        .bind(PostStatus::Failed.as_str())
        .bind(max_retries)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Count posts waiting in the approved queue.
    pub async fn count_approved(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM posts WHERE status = $1")
                .bind(PostStatus::Approved.as_str())
                .fetch_one(pool)
                .await?;
        Ok(count)
    }
}
