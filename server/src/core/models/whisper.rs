//! Whisper Speech-to-Text Backend
//!
//! Provides speech-to-text transcription using whisper.cpp via whisper-rs.
//! The real engine is compiled only with the `whisper` feature; otherwise
//! loading reports a missing dependency.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::SpeechToText;
use crate::core::settings::ModelSettings;
use crate::core::{CoreError, CoreResult};

/// Model file loaded from the models directory when no path is configured
pub const DEFAULT_WHISPER_MODEL: &str = "ggml-base.bin";

// =============================================================================
// Whisper Engine - Feature-gated Implementation
// =============================================================================

#[cfg(feature = "whisper")]
mod engine_impl {
    use super::*;
    use crate::core::analysis::Segment;
    use crate::core::ffmpeg::TRANSCRIPTION_SAMPLE_RATE;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    /// Whisper transcription engine
    pub struct WhisperEngine {
        context: WhisperContext,
        language: String,
    }

    impl WhisperEngine {
        /// Creates a new WhisperEngine from a ggml model file
        pub fn new(model_path: &Path, language: &str) -> CoreResult<Self> {
            let path = model_path.to_str().ok_or_else(|| {
                CoreError::ValidationError(format!(
                    "Model path is not valid UTF-8: {}",
                    model_path.display()
                ))
            })?;

            let params = WhisperContextParameters::default();
            let context = WhisperContext::new_with_params(path, params)
                .map_err(|e| CoreError::Internal(e.to_string()))?;

            Ok(Self {
                context,
                language: language.to_string(),
            })
        }
    }

    impl SpeechToText for WhisperEngine {
        fn transcribe(&self, samples: &[f32]) -> CoreResult<Vec<Segment>> {
            let inference = |e: whisper_rs::WhisperError| CoreError::InferenceFailure(e.to_string());

            let mut state = self.context.create_state().map_err(inference)?;

            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            if self.language != "auto" {
                params.set_language(Some(&self.language));
            }
            params.set_print_progress(false);
            params.set_print_realtime(false);
            params.set_print_timestamps(false);

            state.full(params, samples).map_err(inference)?;

            let num_segments = state.full_n_segments().map_err(inference)?;
            let mut segments = Vec::with_capacity(num_segments.max(0) as usize);

            // Whisper timestamps are in centiseconds
            for i in 0..num_segments {
                let start = state.full_get_segment_t0(i).map_err(inference)? as f64 / 100.0;
                let end = state.full_get_segment_t1(i).map_err(inference)? as f64 / 100.0;
                let text = state.full_get_segment_text(i).map_err(inference)?;

                segments.push(Segment::new(start, end.max(start), text.trim()));
            }

            tracing::debug!(
                "Transcribed {:.1}s of audio into {} segments",
                samples.len() as f64 / TRANSCRIPTION_SAMPLE_RATE as f64,
                segments.len()
            );
            Ok(segments)
        }
    }
}

/// Loads the configured Whisper model.
pub fn load_speech_to_text(settings: &ModelSettings) -> CoreResult<Arc<dyn SpeechToText>> {
    load_engine(&model_path(settings), &settings.whisper_language)
}

fn model_path(settings: &ModelSettings) -> PathBuf {
    settings
        .whisper_model_path
        .clone()
        .unwrap_or_else(|| default_models_dir().join(DEFAULT_WHISPER_MODEL))
}

#[cfg(feature = "whisper")]
fn load_engine(model_path: &Path, language: &str) -> CoreResult<Arc<dyn SpeechToText>> {
    if !model_path.exists() {
        return Err(CoreError::DependencyMissing(format!(
            "Whisper model not found: {}",
            model_path.display()
        )));
    }

    let engine = engine_impl::WhisperEngine::new(model_path, language)?;
    Ok(Arc::new(engine))
}

#[cfg(not(feature = "whisper"))]
fn load_engine(_model_path: &Path, _language: &str) -> CoreResult<Arc<dyn SpeechToText>> {
    Err(CoreError::DependencyMissing(
        "Whisper not available. Rebuild with --features whisper".to_string(),
    ))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Checks if whisper transcription is compiled in
pub fn is_whisper_available() -> bool {
    cfg!(feature = "whisper")
}

/// Returns the recommended model directory
pub fn default_models_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("neuralplay")
        .join("models")
        .join("whisper")
}
