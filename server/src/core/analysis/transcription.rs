//! Chunked Transcription
//!
//! Splits the audio track into fixed windows, extracts each one into a
//! temporary WAV, transcribes it and re-bases the segments onto the global
//! timeline before moving on. Any failure ends the stream: a lost window
//! would leave a hole in the timeline.

use std::path::Path;

use super::{AnalysisEvent, AnalysisResult, EventSink, Segment};
use crate::core::ffmpeg::FFmpegRunner;
use crate::core::media::load_audio_samples;
use crate::core::models::SpeechToText;
use crate::core::{CoreError, CoreResult, TimeSec};

/// One extraction window `[start, end)` in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: TimeSec,
    pub end: TimeSec,
}

impl TimeWindow {
    pub fn duration(&self) -> TimeSec {
        self.end - self.start
    }
}

/// Partitions `[0, total)` into `chunk`-second windows, the last truncated.
pub fn plan_windows(total: TimeSec, chunk: TimeSec) -> Vec<TimeWindow> {
    if !total.is_finite() || total <= 0.0 || !chunk.is_finite() || chunk <= 0.0 {
        return Vec::new();
    }

    let count = (total / chunk).ceil() as usize;
    (0..count)
        .map(|k| {
            let start = k as f64 * chunk;
            TimeWindow {
                start,
                end: (start + chunk).min(total),
            }
        })
        .filter(|w| w.duration() > 0.0)
        .collect()
}

/// Shifts window-relative segments onto the global timeline, clamped to the
/// window so adjacent windows never overlap.
pub fn rebase(segments: Vec<Segment>, window: &TimeWindow) -> Vec<Segment> {
    let length = window.duration();
    segments
        .into_iter()
        .map(|s| {
            let start = s.start.clamp(0.0, length);
            let end = s.end.clamp(start, length);
            Segment {
                start: window.start + start,
                end: window.start + end,
                text: s.text,
            }
        })
        .collect()
}

/// Audio access needed by the driver
pub trait AudioSource {
    /// Total duration, `None` when the container does not report one
    fn duration(&self, input: &Path) -> CoreResult<Option<TimeSec>>;

    /// Writes 16kHz mono WAV of `window` (whole file when `None`) to `output`.
    fn extract(&self, input: &Path, window: Option<&TimeWindow>, output: &Path) -> CoreResult<()>;
}

impl AudioSource for FFmpegRunner {
    fn duration(&self, input: &Path) -> CoreResult<Option<TimeSec>> {
        Ok(self.probe(input)?.duration_sec)
    }

    fn extract(&self, input: &Path, window: Option<&TimeWindow>, output: &Path) -> CoreResult<()> {
        self.extract_audio(
            input,
            window.map(|w| w.start),
            window.map(|w| w.duration()),
            output,
        )
    }
}

/// Transcribes `input` window by window, emitting segments as soon as each
/// window is done, followed by a progress event.
pub fn transcribe_chunked(
    audio: &dyn AudioSource,
    model: &dyn SpeechToText,
    input: &Path,
    chunk_duration: TimeSec,
    sink: &EventSink,
) -> AnalysisResult<AnalysisEvent> {
    if !input.exists() {
        return Err(CoreError::InputNotFound(input.display().to_string()).into());
    }

    let total = match audio.duration(input) {
        Ok(total) => total,
        Err(e @ CoreError::InputNotFound(_)) => return Err(e.into()),
        Err(e) => {
            tracing::warn!("Duration probe failed, transcribing whole file: {}", e);
            None
        }
    };

    let mut count = 0;
    match total {
        Some(total) => {
            let windows = plan_windows(total, chunk_duration);
            tracing::info!(
                "Transcribing {} in {} windows of {}s",
                input.display(),
                windows.len(),
                chunk_duration
            );

            for window in &windows {
                let segments = transcribe_window(audio, model, input, Some(window))?;
                for segment in rebase(segments, window) {
                    sink.emit(AnalysisEvent::Segment { data: segment })?;
                    count += 1;
                }
                sink.emit(AnalysisEvent::Progress {
                    percent: (window.end / total * 100.0).round() as u32,
                    message: format!("Transcribed {:.0}s of {:.0}s", window.end, total),
                })?;
            }
        }
        None => {
            for segment in transcribe_window(audio, model, input, None)? {
                sink.emit(AnalysisEvent::Segment { data: segment })?;
                count += 1;
            }
            sink.emit(AnalysisEvent::Progress {
                percent: 100,
                message: "Transcribed whole file".to_string(),
            })?;
        }
    }

    Ok(AnalysisEvent::done("Transcription complete", count))
}

/// Extracts and transcribes one window. The temporary WAV is removed when
/// this returns, on every path.
fn transcribe_window(
    audio: &dyn AudioSource,
    model: &dyn SpeechToText,
    input: &Path,
    window: Option<&TimeWindow>,
) -> CoreResult<Vec<Segment>> {
    let temp = tempfile::Builder::new()
        .prefix("neuralplay_chunk_")
        .suffix(".wav")
        .tempfile()?;

    audio.extract(input, window, temp.path())?;
    let samples = load_audio_samples(temp.path())?;
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    model.transcribe(&samples).map_err(|e| match e {
        CoreError::InferenceFailure(_) => e,
        other => CoreError::InferenceFailure(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analysis::AnalysisStream;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;

    #[test]
    fn test_plan_windows_ninety_seconds() {
        let windows = plan_windows(90.0, 20.0);
        let starts: Vec<f64> = windows.iter().map(|w| w.start).collect();
        assert_eq!(starts, vec![0.0, 20.0, 40.0, 60.0, 80.0]);
        assert_eq!(windows[4], TimeWindow { start: 80.0, end: 90.0 });
    }

    #[test]
    fn test_plan_windows_exact_multiple_and_degenerate() {
        assert_eq!(plan_windows(40.0, 20.0).len(), 2);
        assert!(plan_windows(0.0, 20.0).is_empty());
        assert!(plan_windows(f64::NAN, 20.0).is_empty());
        assert_eq!(plan_windows(5.0, 20.0), vec![TimeWindow { start: 0.0, end: 5.0 }]);
    }

    #[test]
    fn test_rebase_offsets_and_clamps() {
        let window = TimeWindow {
            start: 40.0,
            end: 60.0,
        };
        let rebased = rebase(
            vec![
                Segment::new(0.0, 4.5, "first"),
                Segment::new(18.0, 21.3, "overruns"),
            ],
            &window,
        );
        assert_eq!(rebased[0], Segment::new(40.0, 44.5, "first"));
        assert_eq!(rebased[1], Segment::new(58.0, 60.0, "overruns"));
    }

    /// Writes a short silent WAV for every extraction and remembers where.
    struct FakeAudio {
        duration: Option<f64>,
        fail_at: Option<f64>,
        extracted: Mutex<Vec<(Option<f64>, PathBuf)>>,
    }

    impl FakeAudio {
        fn new(duration: Option<f64>) -> Self {
            Self {
                duration,
                fail_at: None,
                extracted: Mutex::new(Vec::new()),
            }
        }
    }

    impl AudioSource for FakeAudio {
        fn duration(&self, _input: &Path) -> CoreResult<Option<TimeSec>> {
            Ok(self.duration)
        }

        fn extract(&self, _input: &Path, window: Option<&TimeWindow>, output: &Path) -> CoreResult<()> {
            let start = window.map(|w| w.start);
            self.extracted
                .lock()
                .unwrap()
                .push((start, output.to_path_buf()));

            if start.is_some() && start == self.fail_at {
                return Err(CoreError::DecodeFailure("Invalid data found".into()));
            }

            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: 16000,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let mut writer = hound::WavWriter::create(output, spec).unwrap();
            for _ in 0..160 {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
            Ok(())
        }
    }

    /// Returns the same two relative segments for every window
    struct TwoSegments;

    impl SpeechToText for TwoSegments {
        fn transcribe(&self, _samples: &[f32]) -> CoreResult<Vec<Segment>> {
            Ok(vec![
                Segment::new(1.0, 2.0, "hello"),
                Segment::new(5.0, 8.0, "world"),
            ])
        }
    }

    async fn run(audio: Arc<FakeAudio>, input: PathBuf) -> Vec<AnalysisEvent> {
        let mut stream = AnalysisStream::spawn(32, move |sink| {
            let outcome = transcribe_chunked(audio.as_ref(), &TwoSegments, &input, 20.0, sink);
            let _ = sink.finish(outcome);
        });

        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event);
        }
        events
    }

    fn segments(events: &[AnalysisEvent]) -> Vec<Segment> {
        events
            .iter()
            .filter_map(|e| match e {
                AnalysisEvent::Segment { data } => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_segments_rebased_per_window_with_progress() {
        let input = NamedTempFile::new().unwrap();
        let audio = Arc::new(FakeAudio::new(Some(50.0)));

        let events = run(audio.clone(), input.path().to_path_buf()).await;

        let starts: Vec<f64> = segments(&events).iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![1.0, 5.0, 21.0, 25.0, 41.0, 45.0]);
        assert!(segments(&events).iter().all(|s| s.end <= 50.0 + 20.0));

        let progress: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                AnalysisEvent::Progress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![40, 80, 100]);

        // Segments of a window precede its progress tick
        assert_eq!(events[0].type_name(), "segment");
        assert_eq!(events[2].type_name(), "progress");
        assert!(matches!(events.last(), Some(AnalysisEvent::Done { count: 6, .. })));

        // Every temporary WAV is gone
        let extracted = audio.extracted.lock().unwrap();
        assert_eq!(extracted.len(), 3);
        assert!(extracted.iter().all(|(_, path)| !path.exists()));
    }

    #[tokio::test]
    async fn test_unknown_duration_transcribes_whole_file() {
        let input = NamedTempFile::new().unwrap();
        let audio = Arc::new(FakeAudio::new(None));

        let events = run(audio.clone(), input.path().to_path_buf()).await;

        assert_eq!(segments(&events).len(), 2);
        assert_eq!(segments(&events)[1].start, 5.0);
        assert!(events
            .iter()
            .any(|e| matches!(e, AnalysisEvent::Progress { percent: 100, .. })));
        assert_eq!(audio.extracted.lock().unwrap()[0].0, None);
    }

    #[tokio::test]
    async fn test_failed_window_aborts_stream() {
        let input = NamedTempFile::new().unwrap();
        let mut fake = FakeAudio::new(Some(60.0));
        fake.fail_at = Some(20.0);
        let audio = Arc::new(fake);

        let events = run(audio.clone(), input.path().to_path_buf()).await;

        // First window's segments and progress, then one error and nothing else
        assert_eq!(segments(&events).len(), 2);
        match events.last().unwrap() {
            AnalysisEvent::Error { error, .. } => assert!(error.contains("Invalid data found")),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(events.len(), 4);

        let extracted = audio.extracted.lock().unwrap();
        assert_eq!(extracted.len(), 2);
        assert!(extracted.iter().all(|(_, path)| !path.exists()));
    }

    #[tokio::test]
    async fn test_missing_input_is_single_error() {
        let audio = Arc::new(FakeAudio::new(Some(60.0)));
        let events = run(audio, PathBuf::from("/nonexistent/talk.mp4")).await;

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], AnalysisEvent::Error { error, .. } if error.starts_with("File not found")));
    }
}
