//! Request and response bodies of the HTTP routes.

use serde::{Deserialize, Serialize};

use crate::core::analysis::{EmotionDetection, ObjectDetection, SceneBoundary, Segment};
use crate::core::models::Capabilities;
use crate::core::TimeSec;

#[derive(Debug, Deserialize)]
pub struct VideoQuery {
    pub video_path: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscribeStreamQuery {
    pub video_path: String,
    pub chunk_duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct IntervalQuery {
    pub video_path: String,
    pub interval_seconds: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeQuery {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionQuery {
    pub query: String,
    pub video_path: String,
}

#[derive(Debug, Deserialize)]
pub struct StoreTranscriptBody {
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
pub struct TrimRequest {
    pub video_path: String,
    pub start: TimeSec,
    pub end: TimeSec,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub capabilities: Capabilities,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct TrimResponse {
    pub status: &'static str,
    pub output_path: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ScenesResponse {
    pub scenes: Vec<SceneBoundary>,
}

#[derive(Debug, Serialize)]
pub struct DetectionsResponse {
    pub detections: Vec<ObjectDetection>,
}

#[derive(Debug, Serialize)]
pub struct EmotionsResponse {
    pub emotions: Vec<EmotionDetection>,
}
