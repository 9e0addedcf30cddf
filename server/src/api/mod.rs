//! HTTP/SSE Interface
//!
//! Axum router exposing the analysis pipeline, transcript storage and the
//! text utilities. Streaming routes answer with `text/event-stream`, one
//! JSON event per `data:` line.

mod dto;
mod error;
mod handlers;
mod sse;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};

use crate::core::analysis::AnalysisEngine;
use crate::core::store::TranscriptStore;

/// Shared state of every route
#[derive(Clone)]
pub struct AppState {
    pub engine: AnalysisEngine,
    pub store: Arc<Mutex<TranscriptStore>>,
}

impl AppState {
    pub fn new(engine: AnalysisEngine, store: TranscriptStore) -> Self {
        Self {
            engine,
            store: Arc::new(Mutex::new(store)),
        }
    }
}

/// Builds the application router with permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Transcripts
        .route("/transcribe", post(handlers::transcribe))
        .route("/transcribe_stream", get(handlers::transcribe_stream))
        .route("/store_transcript", post(handlers::store_transcript))
        .route("/search_transcript", get(handlers::search_transcript))
        // Visual analysis
        .route("/analyze_stream", get(handlers::analyze_stream))
        .route("/detect_scenes_stream", get(handlers::detect_scenes_stream))
        .route("/detect_objects_stream", get(handlers::detect_objects_stream))
        .route("/detect_emotions_stream", get(handlers::detect_emotions_stream))
        .route("/detect_scenes", post(handlers::detect_scenes))
        .route("/detect_objects", post(handlers::detect_objects))
        .route("/detect_emotions", post(handlers::detect_emotions))
        // Text utilities and editing
        .route("/summarize_scene", post(handlers::summarize_scene))
        .route("/ask_question", post(handlers::ask_question))
        .route("/trim_video", post(handlers::trim_video))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
