//! FFmpeg Integration Module
//!
//! Provides the external decoder used by the analysis pipeline:
//! - Binary detection (configured path, common install dirs, `PATH`)
//! - Media probing through ffprobe
//! - Audio window extraction for chunked transcription
//! - Raw RGB frame decoding for the frame-based analyzers
//! - Stream-copy clip trimming
//!
//! All invocations are synchronous subprocess calls; callers on the async
//! runtime run them on a blocking thread.

mod detection;
mod probe;
mod runner;

pub use detection::*;
pub use probe::{parse_probe_output, MediaProbe};
pub use runner::{FFmpegRunner, TRANSCRIPTION_SAMPLE_RATE};
