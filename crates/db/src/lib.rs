//! Database access layer.
//!
//! Row models and repositories over a PostgreSQL pool. Statuses are
//! stored as their stable string form and parsed back through
//! [`clipforge_core::status::PostStatus`] at the edges.

pub mod models;
pub mod repositories;

/// Run pending migrations from the crate's `migrations/` directory.
pub async fn migrate(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(pool).await
}
