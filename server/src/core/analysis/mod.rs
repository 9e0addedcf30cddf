//! Streaming Analysis Pipeline
//!
//! Transcription, scene, object and emotion analyzers that emit typed
//! [`AnalysisEvent`]s incrementally, plus the aggregation used by
//! non-streaming callers.

pub mod aggregate;
mod detections;
mod engine;
mod events;
mod sampler;
pub mod scenes;
mod sink;
pub mod transcription;

pub use detections::{detect_emotions, detect_objects, labels_above};
pub use engine::AnalysisEngine;
pub use events::{
    AnalysisEvent, EmotionDetection, ObjectDetection, SceneBoundary, Segment, TranscriptData,
};
pub use sampler::Sampler;
pub use scenes::{detect_scenes, SceneStrategy};
pub use sink::{AnalysisAbort, AnalysisResult, AnalysisStream, ConsumerGone, EventSink};
pub use transcription::{plan_windows, transcribe_chunked, TimeWindow};
