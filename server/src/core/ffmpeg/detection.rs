//! FFmpeg Detection Module
//!
//! Resolves the ffmpeg/ffprobe binaries the pipeline will invoke.
//! Resolution never fails: when nothing is found the bare program names are
//! used and the first invocation reports a missing dependency.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use crate::core::process::configure_std_command;

/// Information about the resolved FFmpeg installation
#[derive(Debug, Clone, PartialEq)]
pub struct FFmpegInfo {
    /// Path to ffmpeg binary
    pub ffmpeg_path: PathBuf,
    /// Path to ffprobe binary
    pub ffprobe_path: PathBuf,
    /// FFmpeg version string, when the binary could be queried
    pub version: Option<String>,
}

impl FFmpegInfo {
    /// Uses the given binaries as-is, without probing them.
    pub fn with_paths(ffmpeg_path: impl Into<PathBuf>, ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
            version: None,
        }
    }

    /// Whether a working ffmpeg binary was found
    pub fn is_available(&self) -> bool {
        self.version.is_some()
    }
}

/// Resolves ffmpeg and ffprobe, preferring explicitly configured paths.
pub fn resolve_ffmpeg(ffmpeg: Option<&Path>, ffprobe: Option<&Path>) -> FFmpegInfo {
    let ffmpeg_path = ffmpeg
        .map(Path::to_path_buf)
        .or_else(|| find_binary("ffmpeg"))
        .unwrap_or_else(|| PathBuf::from(binary_name("ffmpeg")));
    let ffprobe_path = ffprobe
        .map(Path::to_path_buf)
        .or_else(|| find_binary("ffprobe"))
        .unwrap_or_else(|| PathBuf::from(binary_name("ffprobe")));

    let version = ffmpeg_version(&ffmpeg_path);
    match &version {
        Some(v) => info!("Using FFmpeg {} at {}", v, ffmpeg_path.display()),
        None => warn!(
            "FFmpeg not found at {}. Transcription, analysis and trimming will fail.",
            ffmpeg_path.display()
        ),
    }

    FFmpegInfo {
        ffmpeg_path,
        ffprobe_path,
        version,
    }
}

fn binary_name(base: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{}.exe", base)
    } else {
        base.to_string()
    }
}

/// Finds a binary in common install locations, then on `PATH`.
fn find_binary(base: &str) -> Option<PathBuf> {
    let name = binary_name(base);

    for dir in get_common_ffmpeg_paths() {
        let candidate = dir.join(&name);
        if candidate.exists() {
            return Some(candidate);
        }
    }

    #[cfg(target_os = "windows")]
    let locator = "where";
    #[cfg(not(target_os = "windows"))]
    let locator = "which";

    let mut cmd = Command::new(locator);
    cmd.arg(base);
    configure_std_command(&mut cmd);
    let output = cmd.output().ok()?;
    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
}

/// Get common FFmpeg installation paths for the current platform
fn get_common_ffmpeg_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    #[cfg(target_os = "windows")]
    {
        paths.push(PathBuf::from(r"C:\ffmpeg\bin"));
        paths.push(PathBuf::from(r"C:\Program Files\ffmpeg\bin"));
        if let Some(local) = dirs::data_local_dir() {
            paths.push(local.join("Microsoft").join("WinGet").join("Links"));
        }
    }

    #[cfg(target_os = "macos")]
    {
        // Homebrew paths
        paths.push(PathBuf::from("/opt/homebrew/bin"));
        paths.push(PathBuf::from("/usr/local/bin"));
    }

    #[cfg(target_os = "linux")]
    {
        paths.push(PathBuf::from("/usr/bin"));
        paths.push(PathBuf::from("/usr/local/bin"));
        paths.push(PathBuf::from("/snap/bin"));
    }

    paths
}

/// Queries `ffmpeg -version`, returning `None` when it cannot run.
fn ffmpeg_version(ffmpeg_path: &Path) -> Option<String> {
    let mut cmd = Command::new(ffmpeg_path);
    cmd.arg("-version");
    configure_std_command(&mut cmd);

    let output = cmd.output().ok()?;
    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout.lines().next().map(parse_version_line)
}

/// Parses the first line of `ffmpeg -version` ("ffmpeg version X ...").
fn parse_version_line(line: &str) -> String {
    line.strip_prefix("ffmpeg version ")
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or(line)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_line() {
        assert_eq!(
            parse_version_line("ffmpeg version 6.1.1-3ubuntu5 Copyright (c) 2000-2023"),
            "6.1.1-3ubuntu5"
        );
        assert_eq!(parse_version_line("something else"), "something else");
    }

    #[test]
    fn test_configured_paths_win() {
        let info = resolve_ffmpeg(
            Some(Path::new("/opt/custom/ffmpeg")),
            Some(Path::new("/opt/custom/ffprobe")),
        );
        assert_eq!(info.ffmpeg_path, PathBuf::from("/opt/custom/ffmpeg"));
        assert_eq!(info.ffprobe_path, PathBuf::from("/opt/custom/ffprobe"));
        // Nothing runs at that path
        assert!(!info.is_available());
    }

    #[test]
    fn test_with_paths_is_unprobed() {
        let info = FFmpegInfo::with_paths("ffmpeg", "ffprobe");
        assert!(info.version.is_none());
    }
}
