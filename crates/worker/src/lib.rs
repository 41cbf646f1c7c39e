//! Queue worker: claims approved posts and runs the pipeline on them.

pub mod cli;
pub mod config;
pub mod processor;

pub use cli::WorkerCommand;
pub use config::WorkerConfig;
pub use processor::{Processor, WorkerError};
