//! Media input: decoded video frames and audio samples.

mod audio;
mod frames;

pub use audio::load_audio_samples;
pub use frames::{scaled_dimensions, FFmpegFrameSource, Frame, FrameSource, RGB_CHANNELS};

#[cfg(test)]
pub(crate) use frames::MemoryFrameSource;
