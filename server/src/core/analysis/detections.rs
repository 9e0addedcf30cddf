//! Object and emotion detection.
//!
//! Both analyzers share one loop: classify every sampled frame, reduce the
//! result to a sorted set of labels and emit it unless empty. A failed
//! classification only loses that sample.

use std::collections::BTreeSet;

use super::sampler::{for_each_sample, Sampler};
use super::{
    AnalysisEvent, AnalysisResult, EmotionDetection, EventSink, ObjectDetection,
};
use crate::core::media::{Frame, FrameSource};
use crate::core::models::{EmotionClassifier, LabelScore, ObjectClassifier};
use crate::core::{CoreResult, TimeSec};

/// Labels scoring strictly above `floor`, deduplicated and sorted.
pub fn labels_above(scores: &[LabelScore], floor: f64) -> Vec<String> {
    scores
        .iter()
        .filter(|s| s.confidence > floor)
        .map(|s| s.label.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn unique_sorted(labels: Vec<String>) -> Vec<String> {
    labels
        .into_iter()
        .filter(|l| !l.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Runs `labels_at` on every sampled frame; returns the number of events emitted.
fn detect_labels<F, E>(
    source: &mut dyn FrameSource,
    interval_sec: f64,
    sink: &EventSink,
    kind: &str,
    mut labels_at: F,
    to_event: E,
) -> AnalysisResult<usize>
where
    F: FnMut(&Frame) -> CoreResult<Vec<String>>,
    E: Fn(TimeSec, Vec<String>) -> AnalysisEvent,
{
    let sampler = Sampler::from_interval(source.frame_rate(), interval_sec);
    let mut emitted = 0;

    for_each_sample(source, &sampler, |frame, time| {
        match labels_at(frame) {
            Ok(labels) if !labels.is_empty() => {
                sink.emit(to_event(time, labels))?;
                emitted += 1;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("{} failed at {:.2}s: {}", kind, time, e),
        }
        Ok(())
    })?;

    Ok(emitted)
}

/// Emits one `object` event per sampled frame with confident detections.
pub fn detect_objects(
    classifier: &dyn ObjectClassifier,
    source: &mut dyn FrameSource,
    interval_sec: f64,
    confidence_floor: f64,
    sink: &EventSink,
) -> AnalysisResult<AnalysisEvent> {
    let count = detect_labels(
        source,
        interval_sec,
        sink,
        "Object detection",
        |frame| Ok(labels_above(&classifier.classify(frame)?, confidence_floor)),
        |time, objects| AnalysisEvent::Objects(ObjectDetection { time, objects }),
    )?;

    Ok(AnalysisEvent::done("Object detection complete", count))
}

/// Emits one `emotion` event per sampled frame with at least one face.
pub fn detect_emotions(
    classifier: &dyn EmotionClassifier,
    source: &mut dyn FrameSource,
    interval_sec: f64,
    sink: &EventSink,
) -> AnalysisResult<AnalysisEvent> {
    let count = detect_labels(
        source,
        interval_sec,
        sink,
        "Emotion detection",
        |frame| Ok(unique_sorted(classifier.dominant_emotions(frame)?)),
        |time, emotions| AnalysisEvent::Emotions(EmotionDetection { time, emotions }),
    )?;

    Ok(AnalysisEvent::done("Emotion detection complete", count))
}
