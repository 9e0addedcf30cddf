//! Route handlers.
//!
//! Streaming routes hand the analysis stream straight to SSE. Aggregated
//! routes fold the same stream and answer with JSON or the first error.

use std::path::PathBuf;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;

use super::dto::*;
use super::error::ApiResult;
use super::sse::event_stream;
use super::AppState;
use crate::core::analysis::{aggregate, Segment, TranscriptData};
use crate::core::{qa, summarize, trim, CoreError};

// =============================================================================
// Service
// =============================================================================

pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "NeuralPlay Backend Running",
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
        capabilities: state.engine.models().capabilities(),
    })
}

// =============================================================================
// Transcription
// =============================================================================

pub async fn transcribe(
    State(state): State<AppState>,
    Query(params): Query<VideoQuery>,
) -> ApiResult<Json<TranscriptData>> {
    let stream = state
        .engine
        .transcribe(PathBuf::from(params.video_path), None);
    Ok(Json(aggregate::collect_transcript(stream).await?))
}

pub async fn transcribe_stream(
    State(state): State<AppState>,
    Query(params): Query<TranscribeStreamQuery>,
) -> impl IntoResponse {
    event_stream(
        state
            .engine
            .transcribe(PathBuf::from(params.video_path), params.chunk_duration),
    )
}

pub async fn store_transcript(
    State(state): State<AppState>,
    Query(params): Query<VideoQuery>,
    Json(body): Json<StoreTranscriptBody>,
) -> ApiResult<Json<StatusResponse>> {
    state
        .store
        .lock()
        .await
        .store_transcript(&params.video_path, &body.segments)?;
    Ok(Json(StatusResponse { status: "ok" }))
}

pub async fn search_transcript(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Segment>>> {
    let hits = state.store.lock().await.search(&params.query)?;
    Ok(Json(hits))
}

// =============================================================================
// Visual Analysis
// =============================================================================

pub async fn analyze_stream(
    State(state): State<AppState>,
    Query(params): Query<VideoQuery>,
) -> impl IntoResponse {
    event_stream(state.engine.analyze_all(PathBuf::from(params.video_path)))
}

/// Scenes are sampled by frame skip, so no interval is taken here.
pub async fn detect_scenes_stream(
    State(state): State<AppState>,
    Query(params): Query<VideoQuery>,
) -> impl IntoResponse {
    event_stream(state.engine.scenes(PathBuf::from(params.video_path)))
}

pub async fn detect_objects_stream(
    State(state): State<AppState>,
    Query(params): Query<IntervalQuery>,
) -> impl IntoResponse {
    event_stream(
        state
            .engine
            .objects(PathBuf::from(params.video_path), params.interval_seconds),
    )
}

pub async fn detect_emotions_stream(
    State(state): State<AppState>,
    Query(params): Query<IntervalQuery>,
) -> impl IntoResponse {
    event_stream(
        state
            .engine
            .emotions(PathBuf::from(params.video_path), params.interval_seconds),
    )
}

pub async fn detect_scenes(
    State(state): State<AppState>,
    Query(params): Query<VideoQuery>,
) -> ApiResult<Json<ScenesResponse>> {
    let stream = state.engine.scenes(PathBuf::from(params.video_path));
    Ok(Json(ScenesResponse {
        scenes: aggregate::collect_scenes(stream).await?,
    }))
}

pub async fn detect_objects(
    State(state): State<AppState>,
    Query(params): Query<VideoQuery>,
) -> ApiResult<Json<DetectionsResponse>> {
    let stream = state.engine.objects(PathBuf::from(params.video_path), None);
    Ok(Json(DetectionsResponse {
        detections: aggregate::collect_objects(stream).await?,
    }))
}

pub async fn detect_emotions(
    State(state): State<AppState>,
    Query(params): Query<VideoQuery>,
) -> ApiResult<Json<EmotionsResponse>> {
    let stream = state.engine.emotions(PathBuf::from(params.video_path), None);
    Ok(Json(EmotionsResponse {
        emotions: aggregate::collect_emotions(stream).await?,
    }))
}

// =============================================================================
// Text Utilities
// =============================================================================

pub async fn summarize_scene(Query(params): Query<SummarizeQuery>) -> Json<SummaryResponse> {
    Json(SummaryResponse {
        summary: summarize::summarize_text(&params.text),
    })
}

pub async fn ask_question(
    State(state): State<AppState>,
    Query(params): Query<QuestionQuery>,
) -> ApiResult<Json<AnswerResponse>> {
    let transcript = state.store.lock().await.load_transcript(&params.video_path)?;
    Ok(Json(AnswerResponse {
        answer: qa::ask_question(&params.query, transcript.as_ref()),
    }))
}

// =============================================================================
// Editing
// =============================================================================

pub async fn trim_video(
    State(state): State<AppState>,
    Json(req): Json<TrimRequest>,
) -> ApiResult<Json<TrimResponse>> {
    let runner = state.engine.runner().clone();
    let input = PathBuf::from(req.video_path);

    let output = tokio::task::spawn_blocking(move || {
        trim::trim_clip(&runner, &input, req.start, req.end)
    })
    .await
    .map_err(|e| CoreError::Internal(format!("Trim task failed: {}", e)))??;

    let output_path = output.display().to_string();
    Ok(Json(TrimResponse {
        status: "success",
        message: format!("Clip saved to {}", output_path),
        output_path,
    }))
}
