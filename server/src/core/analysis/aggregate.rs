//! Folding analysis streams into complete results.
//!
//! Non-streaming callers get either every payload of the requested kind or
//! the first error. Payloads collected before an error are discarded.

use super::{
    AnalysisEvent, AnalysisStream, EmotionDetection, ObjectDetection, SceneBoundary, Segment,
    TranscriptData,
};
use crate::core::{CoreError, CoreResult};

/// Keeps what `select` extracts from each event; stops at the first error.
pub fn fold_events<T, I, F>(events: I, mut select: F) -> CoreResult<Vec<T>>
where
    I: IntoIterator<Item = AnalysisEvent>,
    F: FnMut(AnalysisEvent) -> Option<T>,
{
    let mut collected = Vec::new();
    for event in events {
        if let AnalysisEvent::Error { error, kind } = event {
            return Err(CoreError::Analysis(kind, error));
        }
        if let Some(item) = select(event) {
            collected.push(item);
        }
    }
    Ok(collected)
}

/// Async counterpart of [`fold_events`] over a live stream.
pub async fn collect<T, F>(mut stream: AnalysisStream, mut select: F) -> CoreResult<Vec<T>>
where
    F: FnMut(AnalysisEvent) -> Option<T>,
{
    let mut collected = Vec::new();
    while let Some(event) = stream.next().await {
        if let AnalysisEvent::Error { error, kind } = event {
            return Err(CoreError::Analysis(kind, error));
        }
        if let Some(item) = select(event) {
            collected.push(item);
        }
    }
    Ok(collected)
}

pub fn scene_of(event: AnalysisEvent) -> Option<SceneBoundary> {
    match event {
        AnalysisEvent::Scene(scene) => Some(scene),
        _ => None,
    }
}

pub fn objects_of(event: AnalysisEvent) -> Option<ObjectDetection> {
    match event {
        AnalysisEvent::Objects(detection) => Some(detection),
        _ => None,
    }
}

pub fn emotions_of(event: AnalysisEvent) -> Option<EmotionDetection> {
    match event {
        AnalysisEvent::Emotions(detection) => Some(detection),
        _ => None,
    }
}

pub fn segment_of(event: AnalysisEvent) -> Option<Segment> {
    match event {
        AnalysisEvent::Segment { data } => Some(data),
        _ => None,
    }
}

pub async fn collect_scenes(stream: AnalysisStream) -> CoreResult<Vec<SceneBoundary>> {
    collect(stream, scene_of).await
}

pub async fn collect_objects(stream: AnalysisStream) -> CoreResult<Vec<ObjectDetection>> {
    collect(stream, objects_of).await
}

pub async fn collect_emotions(stream: AnalysisStream) -> CoreResult<Vec<EmotionDetection>> {
    collect(stream, emotions_of).await
}

pub async fn collect_transcript(stream: AnalysisStream) -> CoreResult<TranscriptData> {
    Ok(TranscriptData::from_segments(collect(stream, segment_of).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;

    fn detection(time: f64, label: &str) -> AnalysisEvent {
        AnalysisEvent::Objects(ObjectDetection {
            time,
            objects: vec![label.into()],
        })
    }

    fn progress() -> AnalysisEvent {
        AnalysisEvent::Progress {
            percent: 50,
            message: "half".into(),
        }
    }

    #[test]
    fn test_fold_keeps_payloads_only() {
        let events = vec![
            progress(),
            detection(0.0, "cat"),
            detection(2.0, "dog"),
            AnalysisEvent::done("Object detection complete", 2),
        ];

        let detections = fold_events(events, objects_of).unwrap();
        let labels: Vec<&str> = detections.iter().map(|d| d.objects[0].as_str()).collect();
        assert_eq!(labels, vec!["cat", "dog"]);
    }

    #[test]
    fn test_fold_error_discards_results() {
        let events = vec![
            progress(),
            detection(0.0, "cat"),
            detection(2.0, "dog"),
            AnalysisEvent::Error {
                error: "Decoder failed: truncated".into(),
                kind: ErrorKind::DecodeFailure,
            },
            AnalysisEvent::done("Object detection complete", 2),
        ];

        match fold_events(events, objects_of) {
            Err(err) => {
                assert_eq!(err.kind(), ErrorKind::DecodeFailure);
                assert_eq!(err.to_string(), "Decoder failed: truncated");
            }
            Ok(_) => panic!("expected aggregate error"),
        }
    }

    #[test]
    fn test_fold_filters_by_kind() {
        let events = vec![
            detection(0.0, "cat"),
            AnalysisEvent::Scene(SceneBoundary {
                id: 1,
                start: 0.0,
                end: 2.0,
                duration: 2.0,
                confidence: None,
            }),
        ];
        assert_eq!(fold_events(events, scene_of).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_collect_transcript_from_stream() {
        let stream = AnalysisStream::spawn(8, |sink| {
            let _ = sink.emit(AnalysisEvent::Segment {
                data: Segment::new(0.0, 1.0, "Hello"),
            });
            let _ = sink.emit(progress());
            let _ = sink.emit(AnalysisEvent::Segment {
                data: Segment::new(1.0, 2.0, "there"),
            });
            let _ = sink.emit(AnalysisEvent::done("Transcription complete", 2));
        });

        let transcript = collect_transcript(stream).await.unwrap();
        assert_eq!(transcript.text, "Hello there");
        assert_eq!(transcript.segments.len(), 2);
    }

    #[tokio::test]
    async fn test_collect_surfaces_dependency_error() {
        let stream = AnalysisStream::single(AnalysisEvent::error(&CoreError::DependencyMissing(
            "Vision sidecar not configured".into(),
        )));

        let err = collect_objects(stream).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DependencyMissing);
        assert_eq!(err.to_string(), "Vision sidecar not configured");
    }
}
