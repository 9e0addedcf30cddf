//! Clip trimming: stream-copies a time range of a video into a new file
//! beside the source.

use std::path::{Path, PathBuf};

use crate::core::ffmpeg::FFmpegRunner;
use crate::core::{CoreError, CoreResult, TimeSec};

/// Writes `[start, end)` of `input` to `{stem}_clip_{unix_ts}.mp4` in the
/// same directory and returns the new path.
pub fn trim_clip(
    runner: &FFmpegRunner,
    input: &Path,
    start: TimeSec,
    end: TimeSec,
) -> CoreResult<PathBuf> {
    if !input.exists() {
        return Err(CoreError::InputNotFound(input.display().to_string()));
    }
    validate_range(start, end)?;

    let output = clip_output_path(input, chrono::Utc::now().timestamp());
    runner.trim_clip(input, start, end, &output)?;

    tracing::info!(
        "Trimmed {} [{:.2}s, {:.2}s) to {}",
        input.display(),
        start,
        end,
        output.display()
    );
    Ok(output)
}

fn validate_range(start: TimeSec, end: TimeSec) -> CoreResult<()> {
    if !start.is_finite() || !end.is_finite() {
        return Err(CoreError::ValidationError(
            "start and end must be finite".into(),
        ));
    }
    if start < 0.0 {
        return Err(CoreError::ValidationError(format!(
            "start must be >= 0, got {}",
            start
        )));
    }
    if start >= end {
        return Err(CoreError::ValidationError(format!(
            "start ({}) must be before end ({})",
            start, end
        )));
    }
    Ok(())
}

fn clip_output_path(input: &Path, timestamp: i64) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "clip".to_string());
    input.with_file_name(format!("{}_clip_{}.mp4", stem, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ffmpeg::FFmpegInfo;

    fn runner() -> FFmpegRunner {
        FFmpegRunner::new(FFmpegInfo::with_paths("ffmpeg", "ffprobe"))
    }

    #[test]
    fn test_output_beside_input() {
        let out = clip_output_path(Path::new("/videos/talk.mov"), 1_700_000_000);
        assert_eq!(out, PathBuf::from("/videos/talk_clip_1700000000.mp4"));
    }

    #[test]
    fn test_missing_input() {
        let err = trim_clip(&runner(), Path::new("/nonexistent/a.mp4"), 0.0, 1.0).unwrap_err();
        assert!(matches!(err, CoreError::InputNotFound(_)));
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        for (start, end) in [(-1.0, 2.0), (3.0, 3.0), (5.0, 2.0), (0.0, f64::NAN)] {
            let err = trim_clip(&runner(), file.path(), start, end).unwrap_err();
            assert!(
                matches!(err, CoreError::ValidationError(_)),
                "({}, {}) should be rejected",
                start,
                end
            );
        }
    }

    #[test]
    fn test_valid_range() {
        assert!(validate_range(0.0, 0.5).is_ok());
    }
}
