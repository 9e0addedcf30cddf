//! Vision Inference Sidecar
//!
//! Object detection, facial emotion recognition and scene embeddings are
//! served by an external HTTP process. Every frame is posted as base64 RGB24:
//!
//! - `GET  {base}/health`
//! - `POST {base}/objects`  -> `{"detections":[{"label","confidence"}]}`
//! - `POST {base}/emotions` -> `{"faces":[{"dominant_emotion"}]}`
//! - `POST {base}/features` -> `{"embedding":[float]}`
//!
//! Without the `vision-sidecar` feature, or without a configured URL, every
//! loader reports a missing dependency.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{EmotionClassifier, FeatureExtractor, LabelScore, ObjectClassifier};
use crate::core::settings::ModelSettings;
use crate::core::{CoreError, CoreResult};

// =============================================================================
// Wire Types
// =============================================================================

/// Body of every inference request
#[derive(Debug, Serialize)]
pub struct FrameRequest {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGB24, standard base64
    pub rgb_b64: String,
}

#[derive(Debug, Deserialize)]
pub struct ObjectsResponse {
    #[serde(default)]
    pub detections: Vec<LabelScore>,
}

#[derive(Debug, Deserialize)]
pub struct FaceEmotion {
    pub dominant_emotion: String,
}

#[derive(Debug, Deserialize)]
pub struct EmotionsResponse {
    #[serde(default)]
    pub faces: Vec<FaceEmotion>,
}

#[derive(Debug, Deserialize)]
pub struct FeaturesResponse {
    pub embedding: Vec<f32>,
}

// =============================================================================
// Loaders
// =============================================================================

pub fn load_object_classifier(settings: &ModelSettings) -> CoreResult<Arc<dyn ObjectClassifier>> {
    Ok(Arc::new(connect(settings)?))
}

pub fn load_emotion_classifier(settings: &ModelSettings) -> CoreResult<Arc<dyn EmotionClassifier>> {
    Ok(Arc::new(connect(settings)?))
}

pub fn load_feature_extractor(settings: &ModelSettings) -> CoreResult<Arc<dyn FeatureExtractor>> {
    Ok(Arc::new(connect(settings)?))
}

fn connect(settings: &ModelSettings) -> CoreResult<client::VisionClient> {
    let base_url = settings
        .vision_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            CoreError::DependencyMissing(
                "Vision sidecar not configured. Set NEURALPLAY_VISION_URL".to_string(),
            )
        })?;

    client::VisionClient::connect(base_url, settings.vision_timeout_secs)
}

// =============================================================================
// Sidecar Client - Feature-gated Implementation
// =============================================================================

#[cfg(feature = "vision-sidecar")]
mod client {
    use std::time::Duration;

    use base64::Engine;
    use serde::de::DeserializeOwned;

    use super::*;
    use crate::core::media::Frame;

    /// Blocking HTTP client for the sidecar. Only used from blocking workers.
    pub struct VisionClient {
        base_url: String,
        http: reqwest::blocking::Client,
    }

    impl VisionClient {
        /// Builds the client and checks that the sidecar answers its health probe.
        pub fn connect(base_url: &str, timeout_secs: u64) -> CoreResult<Self> {
            let http = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(timeout_secs.max(1)))
                .build()
                .map_err(|e| CoreError::Internal(format!("Failed to create HTTP client: {}", e)))?;

            let base_url = base_url.trim_end_matches('/').to_string();
            let health = format!("{}/health", base_url);

            let unreachable = |reason: String| {
                CoreError::DependencyMissing(format!(
                    "Vision sidecar unreachable at {}: {}",
                    base_url, reason
                ))
            };

            let response = http.get(&health).send().map_err(|e| unreachable(e.to_string()))?;
            if !response.status().is_success() {
                return Err(unreachable(format!("health check returned {}", response.status())));
            }

            tracing::info!("Connected to vision sidecar at {}", base_url);
            Ok(Self { base_url, http })
        }

        fn infer<R: DeserializeOwned>(&self, route: &str, frame: &Frame) -> CoreResult<R> {
            let body = FrameRequest {
                width: frame.width,
                height: frame.height,
                rgb_b64: base64::engine::general_purpose::STANDARD.encode(&frame.data),
            };

            let response = self
                .http
                .post(format!("{}/{}", self.base_url, route))
                .json(&body)
                .send()
                .map_err(|e| CoreError::InferenceFailure(format!("{} request failed: {}", route, e)))?;

            let status = response.status();
            if !status.is_success() {
                let detail = response.text().unwrap_or_default();
                return Err(CoreError::InferenceFailure(format!(
                    "{} returned {}: {}",
                    route,
                    status,
                    detail.trim()
                )));
            }

            response
                .json::<R>()
                .map_err(|e| CoreError::InferenceFailure(format!("Invalid {} response: {}", route, e)))
        }
    }

    impl ObjectClassifier for VisionClient {
        fn classify(&self, frame: &Frame) -> CoreResult<Vec<LabelScore>> {
            Ok(self.infer::<ObjectsResponse>("objects", frame)?.detections)
        }
    }

    impl EmotionClassifier for VisionClient {
        fn dominant_emotions(&self, frame: &Frame) -> CoreResult<Vec<String>> {
            let response: EmotionsResponse = self.infer("emotions", frame)?;
            Ok(response
                .faces
                .into_iter()
                .map(|face| face.dominant_emotion)
                .collect())
        }
    }

    impl FeatureExtractor for VisionClient {
        fn embed(&self, frame: &Frame) -> CoreResult<Vec<f32>> {
            Ok(self.infer::<FeaturesResponse>("features", frame)?.embedding)
        }
    }
}

#[cfg(not(feature = "vision-sidecar"))]
mod client {
    use super::*;
    use crate::core::media::Frame;

    /// Stub client; never constructed
    pub enum VisionClient {}

    impl VisionClient {
        pub fn connect(_base_url: &str, _timeout_secs: u64) -> CoreResult<Self> {
            Err(CoreError::DependencyMissing(
                "Vision sidecar support not enabled. Rebuild with --features vision-sidecar"
                    .to_string(),
            ))
        }
    }

    impl ObjectClassifier for VisionClient {
        fn classify(&self, _frame: &Frame) -> CoreResult<Vec<LabelScore>> {
            match *self {}
        }
    }

    impl EmotionClassifier for VisionClient {
        fn dominant_emotions(&self, _frame: &Frame) -> CoreResult<Vec<String>> {
            match *self {}
        }
    }

    impl FeatureExtractor for VisionClient {
        fn embed(&self, _frame: &Frame) -> CoreResult<Vec<f32>> {
            match *self {}
        }
    }
}
