//! Analysis Engine
//!
//! Entry point for every analysis request. Each call returns an
//! [`AnalysisStream`] whose producer resolves the model, opens the input and
//! runs the analyzer on a blocking worker.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::detections::{detect_emotions, detect_objects};
use super::scenes::{detect_scenes, SceneStrategy};
use super::sink::ConsumerGone;
use super::transcription::transcribe_chunked;
use super::{AnalysisEvent, AnalysisResult, AnalysisStream, EventSink};
use crate::core::ffmpeg::FFmpegRunner;
use crate::core::media::FFmpegFrameSource;
use crate::core::models::ModelRegistry;
use crate::core::settings::AnalysisSettings;

/// Shared, cheaply cloneable handle to the analysis pipeline
#[derive(Clone)]
pub struct AnalysisEngine {
    runner: FFmpegRunner,
    models: Arc<ModelRegistry>,
    settings: AnalysisSettings,
}

impl AnalysisEngine {
    pub fn new(runner: FFmpegRunner, models: Arc<ModelRegistry>, settings: AnalysisSettings) -> Self {
        Self {
            runner,
            models,
            settings,
        }
    }

    pub fn runner(&self) -> &FFmpegRunner {
        &self.runner
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    /// Chunked transcription; `chunk_duration` overrides the configured window.
    pub fn transcribe(&self, path: PathBuf, chunk_duration: Option<f64>) -> AnalysisStream {
        let chunk = self.settings.chunk_duration_or(chunk_duration);
        self.spawn(move |engine, sink| {
            let _ = engine.run_transcription(&path, chunk, sink);
        })
    }

    pub fn scenes(&self, path: PathBuf) -> AnalysisStream {
        let threshold = self.settings.feature_threshold;
        self.spawn(move |engine, sink| {
            let _ = engine.run_scenes(&path, threshold, sink);
        })
    }

    /// Object detection every `interval` seconds (configured default if `None`).
    pub fn objects(&self, path: PathBuf, interval: Option<f64>) -> AnalysisStream {
        let interval = self.settings.object_interval_or(interval);
        self.spawn(move |engine, sink| {
            let _ = engine.run_objects(&path, interval, sink);
        })
    }

    /// Emotion detection every `interval` seconds (configured default if `None`).
    pub fn emotions(&self, path: PathBuf, interval: Option<f64>) -> AnalysisStream {
        let interval = self.settings.emotion_interval_or(interval);
        self.spawn(move |engine, sink| {
            let _ = engine.run_emotions(&path, interval, sink);
        })
    }

    /// Scenes, then objects, then emotions, then one `complete` event. A
    /// failing analyzer ends with its own `error` and the next one still runs.
    /// Feature-based scene cuts use the stricter combined threshold here.
    pub fn analyze_all(&self, path: PathBuf) -> AnalysisStream {
        self.spawn(move |engine, sink| {
            let _ = engine.run_all(&path, sink);
        })
    }

    fn spawn<F>(&self, producer: F) -> AnalysisStream
    where
        F: FnOnce(&AnalysisEngine, &EventSink) + Send + 'static,
    {
        let engine = self.clone();
        AnalysisStream::spawn(self.settings.channel_capacity, move |sink| {
            producer(&engine, sink)
        })
    }

    fn run_all(&self, path: &Path, sink: &EventSink) -> Result<(), ConsumerGone> {
        self.run_scenes(path, self.settings.combined_feature_threshold, sink)?;
        self.run_objects(path, self.settings.object_interval_sec, sink)?;
        self.run_emotions(path, self.settings.emotion_interval_sec, sink)?;
        sink.emit(AnalysisEvent::Complete {
            message: "All analysis complete".to_string(),
        })
    }

    fn run_transcription(&self, path: &Path, chunk: f64, sink: &EventSink) -> Result<(), ConsumerGone> {
        sink.finish(self.transcription(path, chunk, sink))
    }

    fn run_scenes(&self, path: &Path, threshold: f64, sink: &EventSink) -> Result<(), ConsumerGone> {
        sink.finish(self.scene_detection(path, threshold, sink))
    }

    fn run_objects(&self, path: &Path, interval: f64, sink: &EventSink) -> Result<(), ConsumerGone> {
        sink.finish(self.object_detection(path, interval, sink))
    }

    fn run_emotions(&self, path: &Path, interval: f64, sink: &EventSink) -> Result<(), ConsumerGone> {
        sink.finish(self.emotion_detection(path, interval, sink))
    }

    // Model availability is checked before the input so a missing backend is
    // reported the same way for every file.

    fn transcription(&self, path: &Path, chunk: f64, sink: &EventSink) -> AnalysisResult<AnalysisEvent> {
        let model = self.models.speech.get()?;
        transcribe_chunked(&self.runner, model.as_ref(), path, chunk, sink)
    }

    fn scene_detection(&self, path: &Path, threshold: f64, sink: &EventSink) -> AnalysisResult<AnalysisEvent> {
        let mut source = self.open(path)?;
        let strategy = self.scene_strategy(threshold);
        detect_scenes(
            &strategy,
            &mut source,
            self.settings.scene_frame_skip,
            self.settings.min_scene_duration_sec,
            sink,
        )
    }

    fn object_detection(&self, path: &Path, interval: f64, sink: &EventSink) -> AnalysisResult<AnalysisEvent> {
        let model = self.models.objects.get()?;
        let mut source = self.open(path)?;
        detect_objects(
            model.as_ref(),
            &mut source,
            interval,
            self.settings.confidence_floor,
            sink,
        )
    }

    fn emotion_detection(&self, path: &Path, interval: f64, sink: &EventSink) -> AnalysisResult<AnalysisEvent> {
        let model = self.models.emotions.get()?;
        let mut source = self.open(path)?;
        detect_emotions(model.as_ref(), &mut source, interval, sink)
    }

    fn open(&self, path: &Path) -> AnalysisResult<FFmpegFrameSource> {
        Ok(FFmpegFrameSource::open(
            &self.runner,
            path,
            self.settings.analysis_width,
        )?)
    }

    /// Learned features cut below `feature_threshold` when the extractor
    /// loads, histograms otherwise.
    fn scene_strategy(&self, feature_threshold: f64) -> SceneStrategy {
        match self.models.features.get() {
            Ok(extractor) => SceneStrategy::Features {
                extractor,
                threshold: feature_threshold,
            },
            Err(e) => {
                tracing::debug!("Using histogram scene detection: {}", e);
                SceneStrategy::Histogram {
                    threshold: self.settings.histogram_threshold,
                }
            }
        }
    }
}
