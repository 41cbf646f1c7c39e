//! Repositories over the PostgreSQL pool.

pub mod content_repo;
pub mod post_repo;

pub use content_repo::ContentRepo;
pub use post_repo::PostRepo;
