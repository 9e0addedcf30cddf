//! Scene Detection
//!
//! Compares each sampled frame with the previous one and cuts a scene when
//! they stop looking alike. Two interchangeable similarity measures exist:
//! learned embeddings compared by cosine similarity, and hue/saturation
//! histograms compared by correlation. Their thresholds are independent.

use std::sync::Arc;

use super::sampler::{for_each_sample, Sampler};
use super::{AnalysisEvent, AnalysisResult, EventSink, SceneBoundary};
use crate::core::media::{Frame, FrameSource};
use crate::core::models::FeatureExtractor;
use crate::core::{round2, CoreResult, FrameIndex};

/// Hue bins over [0, 180)
pub const HUE_BINS: usize = 50;
/// Saturation bins over [0, 256)
pub const SATURATION_BINS: usize = 60;

/// How consecutive sampled frames are compared
pub enum SceneStrategy {
    /// Cosine similarity of embeddings; cut when below `threshold`
    Features {
        extractor: Arc<dyn FeatureExtractor>,
        threshold: f64,
    },
    /// Histogram correlation; cut when below `threshold`
    Histogram { threshold: f64 },
}

impl SceneStrategy {
    /// Name reported in the `done` event
    pub fn method(&self) -> &'static str {
        match self {
            SceneStrategy::Features { .. } => "deep_learning",
            SceneStrategy::Histogram { .. } => "histogram",
        }
    }

    fn signature(&self, frame: &Frame) -> CoreResult<Vec<f32>> {
        match self {
            SceneStrategy::Features { extractor, .. } => extractor.embed(frame),
            SceneStrategy::Histogram { .. } => Ok(hue_saturation_histogram(frame)),
        }
    }

    /// Returns `Some(confidence)` when `current` starts a new scene.
    fn compare(&self, previous: &[f32], current: &[f32]) -> Option<Option<f64>> {
        match self {
            SceneStrategy::Features { threshold, .. } => {
                let similarity = cosine_similarity(previous, current);
                (similarity < *threshold).then(|| Some(round2(1.0 - similarity)))
            }
            SceneStrategy::Histogram { threshold } => {
                let correlation = histogram_correlation(previous, current);
                (correlation < *threshold).then_some(None)
            }
        }
    }
}

/// Tracks the open scene and numbers the emitted ones.
#[derive(Debug)]
pub struct BoundaryTracker {
    frame_rate: f64,
    min_duration: f64,
    start_frame: FrameIndex,
    next_id: u32,
}

impl BoundaryTracker {
    pub fn new(frame_rate: f64, min_duration: f64) -> Self {
        Self {
            frame_rate,
            min_duration,
            start_frame: 0,
            next_id: 1,
        }
    }

    /// Closes the open scene at `frame`. Scenes not longer than the minimum
    /// duration are dropped; the next scene starts at `frame` either way.
    pub fn cut(&mut self, frame: FrameIndex, confidence: Option<f64>) -> Option<SceneBoundary> {
        let duration = (frame - self.start_frame) as f64 / self.frame_rate;
        let scene = (duration > self.min_duration)
            .then(|| self.scene(self.start_frame, frame, confidence));
        self.start_frame = frame;
        scene
    }

    /// Closes the trailing scene at end of stream, whatever its length.
    pub fn flush(&mut self, frames_read: u64) -> Option<SceneBoundary> {
        (frames_read > self.start_frame).then(|| self.scene(self.start_frame, frames_read, None))
    }

    /// Number of scenes emitted so far
    pub fn emitted(&self) -> usize {
        (self.next_id - 1) as usize
    }

    fn scene(&mut self, start: FrameIndex, end: FrameIndex, confidence: Option<f64>) -> SceneBoundary {
        let id = self.next_id;
        self.next_id += 1;
        SceneBoundary {
            id,
            start: round2(start as f64 / self.frame_rate),
            end: round2(end as f64 / self.frame_rate),
            duration: round2((end - start) as f64 / self.frame_rate),
            confidence,
        }
    }
}

/// Emits scene boundaries as they are found, then the trailing scene.
pub fn detect_scenes(
    strategy: &SceneStrategy,
    source: &mut dyn FrameSource,
    frame_skip: u64,
    min_duration: f64,
    sink: &EventSink,
) -> AnalysisResult<AnalysisEvent> {
    let sampler = Sampler::from_frame_skip(source.frame_rate(), frame_skip);
    let mut tracker = BoundaryTracker::new(source.frame_rate(), min_duration);
    let mut previous: Option<Vec<f32>> = None;

    let frames_read = for_each_sample(source, &sampler, |frame, time| {
        let current = match strategy.signature(frame) {
            Ok(signature) => signature,
            Err(e) => {
                tracing::warn!("Scene signature failed at {:.2}s: {}", time, e);
                return Ok(());
            }
        };

        if let Some(prev) = &previous {
            if let Some(confidence) = strategy.compare(prev, &current) {
                if let Some(scene) = tracker.cut(frame.index, confidence) {
                    sink.emit(AnalysisEvent::Scene(scene))?;
                }
            }
        }
        previous = Some(current);
        Ok(())
    })?;

    if let Some(scene) = tracker.flush(frames_read) {
        sink.emit(AnalysisEvent::Scene(scene))?;
    }

    let count = tracker.emitted();
    Ok(AnalysisEvent::Done {
        message: format!("Scene detection complete. Found {} scenes.", count),
        count,
        method: Some(strategy.method().to_string()),
    })
}

// =============================================================================
// Similarity Measures
// =============================================================================

/// Cosine similarity; near-zero vectors compare as dissimilar.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt() + 1e-8)
}

/// Pearson correlation of two histograms. Returns 1.0 when either is flat.
pub fn histogram_correlation(a: &[f32], b: &[f32]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 1.0;
    }

    let mean_a = a[..n].iter().map(|v| *v as f64).sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().map(|v| *v as f64).sum::<f64>() / n as f64;

    let mut num = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a[..n].iter().zip(&b[..n]) {
        let dx = *x as f64 - mean_a;
        let dy = *y as f64 - mean_b;
        num += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = var_a * var_b;
    if denom.abs() > f64::EPSILON {
        num / denom.sqrt()
    } else {
        1.0
    }
}

/// 2D hue/saturation histogram (8-bit HSV conventions), min-max normalized
/// to [0, 1] and flattened hue-major.
pub fn hue_saturation_histogram(frame: &Frame) -> Vec<f32> {
    let mut hist = vec![0f32; HUE_BINS * SATURATION_BINS];

    for rgb in frame.data.chunks_exact(3) {
        let (hue, saturation) = hue_saturation(rgb[0], rgb[1], rgb[2]);
        let h_bin = ((hue * HUE_BINS as f32 / 180.0) as usize).min(HUE_BINS - 1);
        let s_bin = ((saturation * SATURATION_BINS as f32 / 256.0) as usize).min(SATURATION_BINS - 1);
        hist[h_bin * SATURATION_BINS + s_bin] += 1.0;
    }

    let (min, max) = hist
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let range = max - min;
    if range > 0.0 {
        for v in &mut hist {
            *v = (*v - min) / range;
        }
    } else {
        hist.iter_mut().for_each(|v| *v = 0.0);
    }
    hist
}

/// Hue in [0, 180) and saturation in [0, 255] for one RGB pixel.
fn hue_saturation(r: u8, g: u8, b: u8) -> (f32, f32) {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    if delta == 0.0 {
        return (0.0, saturation);
    }

    let mut hue = if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if hue < 0.0 {
        hue += 360.0;
    }
    ((hue / 2.0) % 180.0, saturation)
}
