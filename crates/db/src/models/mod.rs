//! Row models and write DTOs.

pub mod content;
pub mod post;

pub use content::{Content, UpdateContent};
pub use post::Post;
