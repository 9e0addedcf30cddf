//! FFmpeg Runner Module
//!
//! Executes FFmpeg commands for the analysis pipeline. Seeking is always
//! done through decoder arguments (`-ss`, `-t`, `-to`), never in-process.

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use super::{parse_probe_output, FFmpegInfo, MediaProbe};
use crate::core::process::{configure_std_command, run_captured};
use crate::core::{CoreError, CoreResult, TimeSec};

/// Sample rate expected by the speech models (mono PCM)
pub const TRANSCRIPTION_SAMPLE_RATE: u32 = 16_000;

/// FFmpeg Runner for executing decoder commands
#[derive(Clone, Debug)]
pub struct FFmpegRunner {
    info: Arc<FFmpegInfo>,
}

impl FFmpegRunner {
    /// Create a new FFmpegRunner from a resolved FFmpeg installation
    pub fn new(info: FFmpegInfo) -> Self {
        Self {
            info: Arc::new(info),
        }
    }

    /// Probe media file to get duration, geometry and frame rate
    pub fn probe(&self, input: &Path) -> CoreResult<MediaProbe> {
        ensure_input(input)?;

        let mut cmd = Command::new(&self.info.ffprobe_path);
        cmd.args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(input);

        let output = run_captured("ffprobe", &mut cmd)?;
        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    /// Extracts mono 16kHz PCM WAV audio, optionally limited to a time range.
    ///
    /// # Arguments
    /// * `input` - Path to the input video/audio file
    /// * `start` - Offset in seconds (`None` = beginning)
    /// * `duration` - Length in seconds (`None` = until the end)
    /// * `output` - Path of the WAV file to write (overwritten)
    pub fn extract_audio(
        &self,
        input: &Path,
        start: Option<TimeSec>,
        duration: Option<TimeSec>,
        output: &Path,
    ) -> CoreResult<()> {
        ensure_input(input)?;

        let mut cmd = Command::new(&self.info.ffmpeg_path);
        cmd.args(audio_window_args(input, start, duration, output));
        run_captured("ffmpeg", &mut cmd)?;
        Ok(())
    }

    /// Copies `[start, end)` of `input` into `output` without re-encoding.
    pub fn trim_clip(
        &self,
        input: &Path,
        start: TimeSec,
        end: TimeSec,
        output: &Path,
    ) -> CoreResult<()> {
        ensure_input(input)?;

        let mut cmd = Command::new(&self.info.ffmpeg_path);
        cmd.args(trim_args(input, start, end, output));
        run_captured("ffmpeg", &mut cmd)?;
        Ok(())
    }

    /// Builds (but does not spawn) a decoder writing raw RGB24 frames of
    /// `width`x`height` to stdout.
    pub fn frame_decoder(&self, input: &Path, width: u32, height: u32) -> Command {
        let mut cmd = Command::new(&self.info.ffmpeg_path);
        cmd.args(decode_args(input, width, height))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        configure_std_command(&mut cmd);
        cmd
    }
}

fn ensure_input(input: &Path) -> CoreResult<()> {
    if !input.exists() {
        return Err(CoreError::InputNotFound(input.display().to_string()));
    }
    Ok(())
}

/// Arguments for extracting a time window as 16kHz mono WAV
fn audio_window_args(
    input: &Path,
    start: Option<TimeSec>,
    duration: Option<TimeSec>,
    output: &Path,
) -> Vec<String> {
    let mut args = vec!["-v".to_string(), "error".to_string(), "-y".to_string()];

    // -ss before -i for fast input seeking
    if let Some(start) = start {
        args.extend(["-ss".to_string(), format!("{:.3}", start)]);
    }
    args.extend(["-i".to_string(), input.to_string_lossy().to_string()]);
    if let Some(duration) = duration {
        args.extend(["-t".to_string(), format!("{:.3}", duration)]);
    }

    args.extend([
        "-vn".to_string(),
        "-ac".to_string(),
        "1".to_string(),
        "-ar".to_string(),
        TRANSCRIPTION_SAMPLE_RATE.to_string(),
        "-c:a".to_string(),
        "pcm_s16le".to_string(),
        output.to_string_lossy().to_string(),
    ]);
    args
}

/// Arguments for a stream-copy trim
fn trim_args(input: &Path, start: TimeSec, end: TimeSec, output: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-ss".to_string(),
        format!("{:.3}", start),
        "-to".to_string(),
        format!("{:.3}", end),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-c".to_string(),
        "copy".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

/// Arguments for decoding every frame to raw RGB24 on stdout
fn decode_args(input: &Path, width: u32, height: u32) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-nostdin".to_string(),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-an".to_string(),
        "-vf".to_string(),
        format!("scale={}:{}", width, height),
        // Keep one output frame per decoded frame so indices match the source
        "-vsync".to_string(),
        "passthrough".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgb24".to_string(),
        "pipe:1".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn runner() -> FFmpegRunner {
        FFmpegRunner::new(FFmpegInfo::with_paths("ffmpeg", "ffprobe"))
    }

    #[test]
    fn test_audio_window_args_seek_before_input() {
        let args = audio_window_args(
            Path::new("/videos/a.mp4"),
            Some(40.0),
            Some(20.0),
            Path::new("/tmp/chunk.wav"),
        );

        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert!(ss < input && input < t);
        assert_eq!(args[ss + 1], "40.000");
        assert_eq!(args[t + 1], "20.000");
        assert!(args.contains(&"16000".to_string()));
        assert_eq!(args.last().unwrap(), "/tmp/chunk.wav");
    }

    #[test]
    fn test_audio_whole_file_args_have_no_range() {
        let args = audio_window_args(
            Path::new("a.mp4"),
            None,
            None,
            Path::new("out.wav"),
        );
        assert!(!args.contains(&"-ss".to_string()));
        assert!(!args.contains(&"-t".to_string()));
    }

    #[test]
    fn test_trim_args_stream_copy() {
        let args = trim_args(
            Path::new("in.mp4"),
            1.5,
            4.25,
            Path::new("out.mp4"),
        );
        assert!(args.windows(2).any(|w| w == ["-c", "copy"]));
        assert!(args.windows(2).any(|w| w == ["-ss", "1.500"]));
        assert!(args.windows(2).any(|w| w == ["-to", "4.250"]));
    }

    #[test]
    fn test_decode_args_raw_rgb() {
        let args = decode_args(Path::new("in.mp4"), 640, 360);
        assert!(args.windows(2).any(|w| w == ["-pix_fmt", "rgb24"]));
        assert!(args.windows(2).any(|w| w == ["-vf", "scale=640:360"]));
        assert_eq!(args.last().unwrap(), "pipe:1");
    }

    #[test]
    fn test_probe_missing_input() {
        let result = runner().probe(&PathBuf::from("/nonexistent/video.mp4"));
        assert!(matches!(result, Err(CoreError::InputNotFound(_))));
    }

    #[test]
    fn test_trim_missing_input() {
        let result = runner().trim_clip(
            Path::new("/nonexistent/video.mp4"),
            0.0,
            1.0,
            Path::new("/tmp/out.mp4"),
        );
        assert!(matches!(result, Err(CoreError::InputNotFound(_))));
    }
}
