//! Domain logic for the clipforge video-generation pipeline.
//!
//! Pure logic, no database or network access. Post lifecycle types,
//! the script/scene model, the VRAM arbiter, the retry primitive, the
//! quality-degradation tier table, and failed-scene merging all live
//! here so they can be unit tested with fake inputs.

pub mod arbiter;
pub mod error;
pub mod merge;
pub mod retry;
pub mod scene;
pub mod script;
pub mod splitting;
pub mod status;
pub mod tiers;
pub mod types;
