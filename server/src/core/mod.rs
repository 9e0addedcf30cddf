//! NeuralPlay Core Engine
//!
//! Streaming video analysis: decoding through ffmpeg, model adapters, the
//! event-producing analyzers, transcript persistence and the small text
//! utilities built on top of stored transcripts.

pub mod analysis;
pub mod ffmpeg;
pub mod media;
pub mod models;
pub mod process;
pub mod qa;
pub mod settings;
pub mod store;
pub mod summarize;
pub mod trim;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;
