//! Analysis Event Types
//!
//! The closed set of events an analyzer can produce. Serialized with a
//! `type` tag, one JSON object per SSE `data:` line.

use serde::{Deserialize, Serialize};

use crate::core::{CoreError, ErrorKind, TimeSec};

/// A transcribed span of speech
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: TimeSec,
    pub end: TimeSec,
    pub text: String,
}

impl Segment {
    pub fn new(start: TimeSec, end: TimeSec, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// A detected scene between two cuts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneBoundary {
    /// 1-based, strictly increasing within one stream
    pub id: u32,
    pub start: TimeSec,
    pub end: TimeSec,
    pub duration: TimeSec,
    /// `1 - similarity`; only reported by the feature strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Object labels seen at one sample point
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectDetection {
    pub time: TimeSec,
    pub objects: Vec<String>,
}

/// Dominant facial emotions seen at one sample point
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionDetection {
    pub time: TimeSec,
    pub emotions: Vec<String>,
}

/// Full transcript: joined text plus its segments
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptData {
    pub text: String,
    pub segments: Vec<Segment>,
}

impl TranscriptData {
    /// Builds the transcript, joining segment texts with single spaces.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        let text = segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Self { text, segments }
    }
}

/// One event of an analysis stream
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnalysisEvent {
    Progress {
        percent: u32,
        message: String,
    },
    Segment {
        data: Segment,
    },
    Scene(SceneBoundary),
    #[serde(rename = "object")]
    Objects(ObjectDetection),
    #[serde(rename = "emotion")]
    Emotions(EmotionDetection),
    /// Terminal failure; nothing follows it within the same analyzer run
    Error {
        error: String,
        #[serde(skip)]
        kind: ErrorKind,
    },
    Done {
        message: String,
        count: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        method: Option<String>,
    },
    /// Ends a combined multi-analyzer stream
    Complete {
        message: String,
    },
}

impl AnalysisEvent {
    pub fn error(err: &CoreError) -> Self {
        AnalysisEvent::Error {
            error: err.to_string(),
            kind: err.kind(),
        }
    }

    pub fn done(message: impl Into<String>, count: usize) -> Self {
        AnalysisEvent::Done {
            message: message.into(),
            count,
            method: None,
        }
    }

    /// Name of the wire `type` tag
    pub fn type_name(&self) -> &'static str {
        match self {
            AnalysisEvent::Progress { .. } => "progress",
            AnalysisEvent::Segment { .. } => "segment",
            AnalysisEvent::Scene(_) => "scene",
            AnalysisEvent::Objects(_) => "object",
            AnalysisEvent::Emotions(_) => "emotion",
            AnalysisEvent::Error { .. } => "error",
            AnalysisEvent::Done { .. } => "done",
            AnalysisEvent::Complete { .. } => "complete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_segment_wire_format() {
        let event = AnalysisEvent::Segment {
            data: Segment::new(1.5, 3.0, "hello"),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "segment", "data": {"start": 1.5, "end": 3.0, "text": "hello"}})
        );
    }

    #[test]
    fn test_scene_is_flattened_and_confidence_optional() {
        let scene = SceneBoundary {
            id: 1,
            start: 0.0,
            end: 2.5,
            duration: 2.5,
            confidence: None,
        };
        assert_eq!(
            serde_json::to_value(AnalysisEvent::Scene(scene.clone())).unwrap(),
            json!({"type": "scene", "id": 1, "start": 0.0, "end": 2.5, "duration": 2.5})
        );

        let with_confidence = SceneBoundary {
            confidence: Some(0.42),
            ..scene
        };
        let value = serde_json::to_value(AnalysisEvent::Scene(with_confidence)).unwrap();
        assert_eq!(value["confidence"], json!(0.42));
    }

    #[test]
    fn test_detection_tags_are_singular() {
        let objects = AnalysisEvent::Objects(ObjectDetection {
            time: 2.0,
            objects: vec!["cat".into()],
        });
        let emotions = AnalysisEvent::Emotions(EmotionDetection {
            time: 3.0,
            emotions: vec!["happy".into()],
        });

        assert_eq!(
            serde_json::to_value(&objects).unwrap(),
            json!({"type": "object", "time": 2.0, "objects": ["cat"]})
        );
        assert_eq!(serde_json::to_value(&emotions).unwrap()["type"], "emotion");
        assert_eq!(objects.type_name(), "object");
    }

    #[test]
    fn test_error_event_hides_kind() {
        let event = AnalysisEvent::error(&CoreError::InputNotFound("a.mp4".into()));
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "error", "error": "File not found: a.mp4"})
        );
        assert_eq!(event.type_name(), "error");
    }

    #[test]
    fn test_done_method_omitted_when_absent() {
        let value = serde_json::to_value(AnalysisEvent::done("Object detection complete", 3)).unwrap();
        assert_eq!(
            value,
            json!({"type": "done", "message": "Object detection complete", "count": 3})
        );
    }

    #[test]
    fn test_event_parses_back() {
        let line = r#"{"type":"progress","percent":40,"message":"Transcribed 40s of 100s"}"#;
        let event: AnalysisEvent = serde_json::from_str(line).unwrap();
        assert_eq!(
            event,
            AnalysisEvent::Progress {
                percent: 40,
                message: "Transcribed 40s of 100s".into()
            }
        );
        assert_eq!(event.type_name(), "progress");
    }

    #[test]
    fn test_transcript_text_joins_segments() {
        let transcript = TranscriptData::from_segments(vec![
            Segment::new(0.0, 1.0, " Hello"),
            Segment::new(1.0, 2.0, "world "),
        ]);
        assert_eq!(transcript.text, "Hello world");
        assert_eq!(transcript.segments.len(), 2);
    }
}
