//! Model Adapters
//!
//! Capability traits for the optional inference backends and the
//! [`ModelHandle`] that loads each of them at most once per process.

mod vision;
mod whisper;

use std::sync::{Arc, Mutex, TryLockError};

use serde::{Deserialize, Serialize};

use crate::core::analysis::Segment;
use crate::core::media::Frame;
use crate::core::settings::ModelSettings;
use crate::core::{CoreError, CoreResult};

pub use vision::{load_emotion_classifier, load_feature_extractor, load_object_classifier};
pub use whisper::{default_models_dir, is_whisper_available, load_speech_to_text};

// =============================================================================
// Capability Traits
// =============================================================================

/// Speech-to-text over 16kHz mono samples; segment times are relative to
/// the first sample.
pub trait SpeechToText: Send + Sync {
    fn transcribe(&self, samples: &[f32]) -> CoreResult<Vec<Segment>>;
}

/// A classifier label with its score in [0, 1]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub confidence: f64,
}

/// Object detector; returns every detection in the frame, duplicates allowed
pub trait ObjectClassifier: Send + Sync {
    fn classify(&self, frame: &Frame) -> CoreResult<Vec<LabelScore>>;
}

/// Facial emotion classifier; one dominant emotion per detected face
pub trait EmotionClassifier: Send + Sync {
    fn dominant_emotions(&self, frame: &Frame) -> CoreResult<Vec<String>>;
}

/// Fixed-length image embedding used for scene similarity
pub trait FeatureExtractor: Send + Sync {
    fn embed(&self, frame: &Frame) -> CoreResult<Vec<f32>>;
}

// =============================================================================
// Model Handle
// =============================================================================

/// Observable lifecycle of a [`ModelHandle`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Unloaded,
    Loading,
    Ready,
    Unavailable,
}

enum LoadState<M: ?Sized> {
    Unloaded,
    Ready(Arc<M>),
    /// Memoized failure message, returned verbatim on every later call
    Unavailable(String),
}

impl<M: ?Sized> LoadState<M> {
    fn status(&self) -> ModelStatus {
        match self {
            LoadState::Unloaded => ModelStatus::Unloaded,
            LoadState::Ready(_) => ModelStatus::Ready,
            LoadState::Unavailable(_) => ModelStatus::Unavailable,
        }
    }
}

type Loader<M> = Box<dyn Fn() -> CoreResult<Arc<M>> + Send + Sync>;

/// Lazily loaded model shared by every request.
///
/// The first [`get`](Self::get) runs the loader while holding the lock, so
/// concurrent callers wait for that single attempt. A failed load is
/// permanent: the loader is never called again and every caller receives a
/// `DependencyMissing` error with the same message.
pub struct ModelHandle<M: ?Sized> {
    name: &'static str,
    loader: Loader<M>,
    state: Mutex<LoadState<M>>,
}

impl<M: ?Sized> ModelHandle<M> {
    pub fn new<F>(name: &'static str, loader: F) -> Self
    where
        F: Fn() -> CoreResult<Arc<M>> + Send + Sync + 'static,
    {
        Self {
            name,
            loader: Box::new(loader),
            state: Mutex::new(LoadState::Unloaded),
        }
    }

    /// Returns the model, loading it on first use.
    pub fn get(&self) -> CoreResult<Arc<M>> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());

        match &*state {
            LoadState::Ready(model) => return Ok(model.clone()),
            LoadState::Unavailable(message) => {
                return Err(CoreError::DependencyMissing(message.clone()))
            }
            LoadState::Unloaded => {}
        }

        match (self.loader)() {
            Ok(model) => {
                tracing::info!("{} model loaded", self.name);
                *state = LoadState::Ready(model.clone());
                Ok(model)
            }
            Err(err) => {
                let message = match err {
                    CoreError::DependencyMissing(message) => message,
                    other => format!("Failed to load {} model: {}", self.name, other),
                };
                tracing::warn!("{} model unavailable: {}", self.name, message);
                *state = LoadState::Unavailable(message.clone());
                Err(CoreError::DependencyMissing(message))
            }
        }
    }

    /// Current lifecycle state; `Loading` while another caller holds the lock.
    pub fn status(&self) -> ModelStatus {
        match self.state.try_lock() {
            Ok(state) => state.status(),
            Err(TryLockError::WouldBlock) => ModelStatus::Loading,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().status(),
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Status of every model, reported by the health endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub transcription: ModelStatus,
    pub objects: ModelStatus,
    pub emotions: ModelStatus,
    pub scene_features: ModelStatus,
}

/// One handle per model kind, built once per process
pub struct ModelRegistry {
    pub speech: ModelHandle<dyn SpeechToText>,
    pub objects: ModelHandle<dyn ObjectClassifier>,
    pub emotions: ModelHandle<dyn EmotionClassifier>,
    pub features: ModelHandle<dyn FeatureExtractor>,
}

impl ModelRegistry {
    /// Registers loaders for the configured backends. Nothing is loaded yet.
    pub fn from_settings(settings: &ModelSettings) -> Self {
        let speech_settings = settings.clone();
        let object_settings = settings.clone();
        let emotion_settings = settings.clone();
        let feature_settings = settings.clone();

        Self {
            speech: ModelHandle::new("Whisper", move || load_speech_to_text(&speech_settings)),
            objects: ModelHandle::new("Object detection", move || {
                load_object_classifier(&object_settings)
            }),
            emotions: ModelHandle::new("Emotion recognition", move || {
                load_emotion_classifier(&emotion_settings)
            }),
            features: ModelHandle::new("Scene feature", move || {
                load_feature_extractor(&feature_settings)
            }),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            transcription: self.speech.status(),
            objects: self.objects.status(),
            emotions: self.emotions.status(),
            scene_features: self.features.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedLabels;

    impl ObjectClassifier for FixedLabels {
        fn classify(&self, _frame: &Frame) -> CoreResult<Vec<LabelScore>> {
            Ok(vec![LabelScore {
                label: "cat".into(),
                confidence: 0.9,
            }])
        }
    }

    #[test]
    fn test_missing_dependency_is_memoized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle: ModelHandle<dyn ObjectClassifier> = ModelHandle::new("Object detection", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(CoreError::DependencyMissing(
                "Object detection backend not configured".into(),
            ))
        });

        assert_eq!(handle.status(), ModelStatus::Unloaded);
        let first = handle.get().err().unwrap().to_string();
        let second = handle.get().err().unwrap().to_string();

        assert_eq!(first, second);
        assert_eq!(first, "Object detection backend not configured");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.status(), ModelStatus::Unavailable);
    }

    #[test]
    fn test_construction_error_becomes_dependency_missing() {
        let handle: ModelHandle<dyn ObjectClassifier> = ModelHandle::new("Object detection", || {
            Err(CoreError::Internal("corrupt weights".into()))
        });

        match handle.get() {
            Err(CoreError::DependencyMissing(message)) => {
                assert!(message.contains("corrupt weights"));
                assert!(message.starts_with("Failed to load Object detection model"));
            }
            _ => panic!("expected DependencyMissing"),
        }
    }

    #[test]
    fn test_loaded_model_is_shared() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle: ModelHandle<dyn ObjectClassifier> = ModelHandle::new("Object detection", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(FixedLabels) as Arc<dyn ObjectClassifier>)
        });

        let a = handle.get().unwrap();
        let b = handle.get().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.status(), ModelStatus::Ready);
    }

    #[test]
    fn test_unconfigured_registry_reports_unloaded_then_unavailable() {
        let registry = ModelRegistry::from_settings(&ModelSettings::default());
        assert_eq!(registry.capabilities().objects, ModelStatus::Unloaded);

        assert!(registry.objects.get().is_err());
        assert_eq!(registry.capabilities().objects, ModelStatus::Unavailable);
    }
}
