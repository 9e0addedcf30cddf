//! Uniform frame sampling.

use super::AnalysisResult;
use crate::core::media::{Frame, FrameSource};
use crate::core::{FrameIndex, TimeSec};

/// Decides which frames are analyzed: every `stride`-th frame from 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampler {
    stride: u64,
    frame_rate: f64,
}

impl Sampler {
    /// `stride = max(1, round(frame_rate * interval_sec))`
    pub fn from_interval(frame_rate: f64, interval_sec: f64) -> Self {
        let raw = (frame_rate * interval_sec).round();
        let stride = if raw.is_finite() && raw >= 1.0 {
            raw as u64
        } else {
            1
        };
        Self { stride, frame_rate }
    }

    /// Samples every `skip`-th frame (0 is treated as 1).
    pub fn from_frame_skip(frame_rate: f64, skip: u64) -> Self {
        Self {
            stride: skip.max(1),
            frame_rate,
        }
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn is_sampled(&self, index: FrameIndex) -> bool {
        index % self.stride == 0
    }

    pub fn timestamp(&self, index: FrameIndex) -> TimeSec {
        index as f64 / self.frame_rate
    }
}

/// Reads `source` to the end, calling `visit` on every sampled frame with
/// its timestamp. Returns the number of frames read.
pub(crate) fn for_each_sample<F>(
    source: &mut dyn FrameSource,
    sampler: &Sampler,
    mut visit: F,
) -> AnalysisResult<u64>
where
    F: FnMut(&Frame, TimeSec) -> AnalysisResult<()>,
{
    let mut frames_read = 0;
    while let Some(frame) = source.next_frame()? {
        frames_read += 1;
        if sampler.is_sampled(frame.index) {
            visit(&frame, sampler.timestamp(frame.index))?;
        }
    }
    Ok(frames_read)
}
