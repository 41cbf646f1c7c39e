//! ComfyUI client for video clip generation.
//!
//! Provides the HTTP API wrapper, typed WebSocket message parsing,
//! workflow template patching, completion awaiters (push over
//! WebSocket with a polling fallback), and the high-level
//! [`client::ComfyClient`] that turns a generation request into a
//! finished clip file on the shared output mount.

pub mod api;
pub mod awaiter;
pub mod client;
pub mod error;
pub mod messages;
pub mod workflow;

pub use client::{ComfyClient, ComfyClientConfig, GenerationRequest};
pub use error::ComfyError;
