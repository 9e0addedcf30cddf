//! Server Settings
//!
//! Provides backend configuration with:
//! - Optional JSON settings file with per-field defaults
//! - Environment variable overrides
//! - Normalization that clamps bad values instead of failing
//!
//! Precedence (lowest to highest): defaults, settings file, environment,
//! command-line flags (applied by the binaries).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::core::{CoreError, CoreResult};

/// Environment variable naming the settings file
pub const ENV_CONFIG: &str = "NEURALPLAY_CONFIG";
pub const ENV_BIND: &str = "NEURALPLAY_BIND";
pub const ENV_DATABASE: &str = "NEURALPLAY_DATABASE";
pub const ENV_FFMPEG: &str = "NEURALPLAY_FFMPEG";
pub const ENV_FFPROBE: &str = "NEURALPLAY_FFPROBE";
pub const ENV_WHISPER_MODEL: &str = "NEURALPLAY_WHISPER_MODEL";
pub const ENV_VISION_URL: &str = "NEURALPLAY_VISION_URL";
pub const ENV_LOG_DIR: &str = "NEURALPLAY_LOG_DIR";

/// Top-level backend settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    /// Socket address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// SQLite database file for stored transcripts
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Explicit ffmpeg binary (detected when unset)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Explicit ffprobe binary (detected when unset)
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// Directory for rolling log files (stdout only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Model backends
    #[serde(default)]
    pub models: ModelSettings,

    /// Analysis cadence and thresholds
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("neuralplay.db")
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            database_path: default_database_path(),
            ffmpeg_path: None,
            ffprobe_path: None,
            log_dir: None,
            models: ModelSettings::default(),
            analysis: AnalysisSettings::default(),
        }
    }
}

impl ServerSettings {
    /// Loads settings from an optional JSON file, applies environment
    /// overrides and normalizes the result.
    ///
    /// When `path` is `None`, `NEURALPLAY_CONFIG` is consulted. A missing
    /// file named explicitly is an error; no file at all means defaults.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut settings = match Self::config_path(path, |key| std::env::var(key).ok()) {
            Some(path) => {
                if !path.exists() {
                    return Err(CoreError::InputNotFound(path.display().to_string()));
                }
                let content = fs::read_to_string(&path)?;
                serde_json::from_str(&content)?
            }
            None => ServerSettings::default(),
        };

        settings.apply_env_from(|key| std::env::var(key).ok());
        settings.normalize();
        Ok(settings)
    }

    /// Config file to read: the explicit path, else `NEURALPLAY_CONFIG`.
    pub fn config_path<F>(explicit: Option<&Path>, lookup: F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        explicit.map(Path::to_path_buf).or_else(|| {
            lookup(ENV_CONFIG)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        })
    }

    /// Applies overrides from an environment-like lookup.
    ///
    /// Takes the lookup as a closure so tests do not mutate process state.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bind) = non_empty(ENV_BIND) {
            self.bind_address = bind;
        }
        if let Some(db) = non_empty(ENV_DATABASE) {
            self.database_path = PathBuf::from(db);
        }
        if let Some(ffmpeg) = non_empty(ENV_FFMPEG) {
            self.ffmpeg_path = Some(PathBuf::from(ffmpeg));
        }
        if let Some(ffprobe) = non_empty(ENV_FFPROBE) {
            self.ffprobe_path = Some(PathBuf::from(ffprobe));
        }
        if let Some(model) = non_empty(ENV_WHISPER_MODEL) {
            self.models.whisper_model_path = Some(PathBuf::from(model));
        }
        if let Some(url) = non_empty(ENV_VISION_URL) {
            self.models.vision_url = Some(url);
        }
        if let Some(dir) = non_empty(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir));
        }
    }

    /// Normalizes and clamps settings so the running configuration is always valid.
    pub fn normalize(&mut self) {
        if self.bind_address.trim().is_empty() {
            warn!("Empty bind address in settings, using default");
            self.bind_address = default_bind_address();
        }
        if let Some(url) = &self.models.vision_url {
            let trimmed = url.trim().trim_end_matches('/').to_string();
            self.models.vision_url = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            };
        }
        self.models.vision_timeout_secs = self.models.vision_timeout_secs.clamp(1, 600);
        self.analysis.normalize();
    }
}

// =============================================================================
// Model Settings
// =============================================================================

/// Where the optional model backends come from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelSettings {
    /// Whisper ggml model file (defaults to the base model in the models dir)
    #[serde(default)]
    pub whisper_model_path: Option<PathBuf>,

    /// Whisper language hint, "auto" for detection
    #[serde(default = "default_language")]
    pub whisper_language: String,

    /// Base URL of the vision inference sidecar
    #[serde(default)]
    pub vision_url: Option<String>,

    /// Per-request timeout for the sidecar
    #[serde(default = "default_vision_timeout")]
    pub vision_timeout_secs: u64,
}

fn default_language() -> String {
    "auto".to_string()
}

fn default_vision_timeout() -> u64 {
    30
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            whisper_model_path: None,
            whisper_language: default_language(),
            vision_url: None,
            vision_timeout_secs: default_vision_timeout(),
        }
    }
}

// =============================================================================
// Analysis Settings
// =============================================================================

/// Sampling cadence and decision thresholds for the streaming analyzers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSettings {
    /// Transcription window length in seconds
    #[serde(default = "default_chunk_duration")]
    pub chunk_duration_sec: f64,

    /// Object detection sampling interval in seconds
    #[serde(default = "default_object_interval")]
    pub object_interval_sec: f64,

    /// Emotion detection sampling interval in seconds
    #[serde(default = "default_emotion_interval")]
    pub emotion_interval_sec: f64,

    /// Scene detection inspects every Nth frame
    #[serde(default = "default_scene_frame_skip")]
    pub scene_frame_skip: u64,

    /// Object labels at or below this confidence are dropped
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f64,

    /// Cosine-similarity cut threshold for the learned-feature scene strategy
    #[serde(default = "default_feature_threshold")]
    pub feature_threshold: f64,

    /// Histogram-correlation cut threshold for the fallback scene strategy
    #[serde(default = "default_histogram_threshold")]
    pub histogram_threshold: f64,

    /// Feature-strategy cut threshold used by the combined analysis stream
    #[serde(default = "default_combined_feature_threshold")]
    pub combined_feature_threshold: f64,

    /// Scenes must be strictly longer than this (except the trailing one)
    #[serde(default = "default_min_scene_duration")]
    pub min_scene_duration_sec: f64,

    /// Decoded frames are scaled to this width before analysis
    #[serde(default = "default_analysis_width")]
    pub analysis_width: u32,

    /// Events buffered between a producer and its consumer
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_chunk_duration() -> f64 {
    20.0
}

fn default_object_interval() -> f64 {
    2.0
}

fn default_emotion_interval() -> f64 {
    3.0
}

fn default_scene_frame_skip() -> u64 {
    15
}

fn default_confidence_floor() -> f64 {
    0.5
}

fn default_feature_threshold() -> f64 {
    0.7
}

fn default_histogram_threshold() -> f64 {
    0.85
}

fn default_combined_feature_threshold() -> f64 {
    0.85
}

fn default_min_scene_duration() -> f64 {
    1.0
}

fn default_analysis_width() -> u32 {
    640
}

fn default_channel_capacity() -> usize {
    16
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            chunk_duration_sec: default_chunk_duration(),
            object_interval_sec: default_object_interval(),
            emotion_interval_sec: default_emotion_interval(),
            scene_frame_skip: default_scene_frame_skip(),
            confidence_floor: default_confidence_floor(),
            feature_threshold: default_feature_threshold(),
            histogram_threshold: default_histogram_threshold(),
            combined_feature_threshold: default_combined_feature_threshold(),
            min_scene_duration_sec: default_min_scene_duration(),
            analysis_width: default_analysis_width(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

const CHUNK_RANGE: (f64, f64) = (1.0, 600.0);
const INTERVAL_RANGE: (f64, f64) = (0.01, 3600.0);

impl AnalysisSettings {
    /// Clamps every field into its valid range.
    pub fn normalize(&mut self) {
        self.chunk_duration_sec = clamp_range(
            self.chunk_duration_sec,
            CHUNK_RANGE,
            default_chunk_duration(),
        );
        self.object_interval_sec = clamp_range(
            self.object_interval_sec,
            INTERVAL_RANGE,
            default_object_interval(),
        );
        self.emotion_interval_sec = clamp_range(
            self.emotion_interval_sec,
            INTERVAL_RANGE,
            default_emotion_interval(),
        );
        self.scene_frame_skip = self.scene_frame_skip.clamp(1, 10_000);
        self.confidence_floor =
            clamp_f64(self.confidence_floor, 0.0, 1.0, default_confidence_floor());
        self.feature_threshold =
            clamp_f64(self.feature_threshold, 0.0, 1.0, default_feature_threshold());
        self.histogram_threshold = clamp_f64(
            self.histogram_threshold,
            0.0,
            1.0,
            default_histogram_threshold(),
        );
        self.combined_feature_threshold = clamp_f64(
            self.combined_feature_threshold,
            0.0,
            1.0,
            default_combined_feature_threshold(),
        );
        self.min_scene_duration_sec = clamp_f64(
            self.min_scene_duration_sec,
            0.0,
            3600.0,
            default_min_scene_duration(),
        );
        self.analysis_width = self.analysis_width.clamp(64, 3840);
        self.channel_capacity = self.channel_capacity.clamp(1, 1024);
    }

    /// Transcription window for one request. Missing or non-positive
    /// overrides fall back to the configured value; others are clamped.
    pub fn chunk_duration_or(&self, requested: Option<f64>) -> f64 {
        request_override(requested, CHUNK_RANGE).unwrap_or(self.chunk_duration_sec)
    }

    /// Object sampling interval for one request, bounded like the setting.
    pub fn object_interval_or(&self, requested: Option<f64>) -> f64 {
        request_override(requested, INTERVAL_RANGE).unwrap_or(self.object_interval_sec)
    }

    /// Emotion sampling interval for one request, bounded like the setting.
    pub fn emotion_interval_or(&self, requested: Option<f64>) -> f64 {
        request_override(requested, INTERVAL_RANGE).unwrap_or(self.emotion_interval_sec)
    }
}

fn request_override(requested: Option<f64>, (min, max): (f64, f64)) -> Option<f64> {
    requested
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v.clamp(min, max))
}

fn clamp_range(value: f64, (min, max): (f64, f64), fallback: f64) -> f64 {
    clamp_f64(value, min, max, fallback)
}

fn clamp_f64(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

// =============================================================================
// Tests
// =============================================================================
