//! NeuralPlay Error Definitions
//!
//! Defines error types used throughout the analysis pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a failure, carried alongside error events so a
/// non-streaming caller can rebuild a typed error from a finished stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// An optional model or tool is not installed (permanent)
    DependencyMissing,
    /// The requested input file does not exist
    InputNotFound,
    /// The external decoder exited with an error
    DecodeFailure,
    /// A model call failed
    InferenceFailure,
    /// Request parameters were rejected
    Validation,
    /// Anything else
    #[default]
    Internal,
}

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Pipeline Errors
    // =========================================================================
    #[error("{0}")]
    DependencyMissing(String),

    #[error("File not found: {0}")]
    InputNotFound(String),

    #[error("Decoder failed: {0}")]
    DecodeFailure(String),

    #[error("Inference failed: {0}")]
    InferenceFailure(String),

    /// Terminal error replayed from a finished analysis stream
    #[error("{1}")]
    Analysis(ErrorKind, String),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Returns the error classification used on the event wire
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::DependencyMissing(_) => ErrorKind::DependencyMissing,
            CoreError::InputNotFound(_) => ErrorKind::InputNotFound,
            CoreError::DecodeFailure(_) => ErrorKind::DecodeFailure,
            CoreError::InferenceFailure(_) => ErrorKind::InferenceFailure,
            CoreError::Analysis(kind, _) => *kind,
            CoreError::ValidationError(_) => ErrorKind::Validation,
            CoreError::DatabaseError(_)
            | CoreError::IoError(_)
            | CoreError::JsonError(_)
            | CoreError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::DatabaseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(
            CoreError::InputNotFound("a.mp4".into()).kind(),
            ErrorKind::InputNotFound
        );
        assert_eq!(
            CoreError::DependencyMissing("whisper".into()).kind(),
            ErrorKind::DependencyMissing
        );
        assert_eq!(
            CoreError::Internal("boom".into()).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_replayed_error_keeps_message_verbatim() {
        let original = CoreError::InputNotFound("/videos/a.mp4".into());
        let replayed = CoreError::Analysis(original.kind(), original.to_string());

        assert_eq!(replayed.to_string(), "File not found: /videos/a.mp4");
        assert_eq!(replayed.kind(), ErrorKind::InputNotFound);
    }

    #[test]
    fn test_dependency_missing_display_is_bare_message() {
        let err = CoreError::DependencyMissing("Whisper not available".into());
        assert_eq!(err.to_string(), "Whisper not available");
    }
}
