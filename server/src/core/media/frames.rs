//! Frame Source
//!
//! Sequential access to decoded video frames. The production source reads
//! raw RGB24 frames from an `ffmpeg` child process; analyzers only see the
//! [`FrameSource`] trait so tests can feed synthetic frames.

use std::io::{self, BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command};
use std::thread::JoinHandle;

use crate::core::ffmpeg::FFmpegRunner;
use crate::core::process::spawn_error;
use crate::core::{effective_frame_rate, CoreError, CoreResult, FrameIndex};

/// Bytes per pixel of the RGB24 frames handed to analyzers
pub const RGB_CHANNELS: usize = 3;

/// One decoded frame, tightly packed RGB24
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Zero-based position in the decoded stream
    pub index: FrameIndex,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    /// Returns the RGB triple at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let offset = (y as usize * self.width as usize + x as usize) * RGB_CHANNELS;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }
}

/// Sequential frame access
pub trait FrameSource: Send {
    /// Frames per second; always positive
    fn frame_rate(&self) -> f64;

    /// Returns the next frame, or `None` at end of stream
    fn next_frame(&mut self) -> CoreResult<Option<Frame>>;
}

/// Computes analysis dimensions: at most `target_width` wide, aspect ratio
/// kept, both sides even (required by the scaler for RGB output).
pub fn scaled_dimensions(src_width: u32, src_height: u32, target_width: u32) -> Option<(u32, u32)> {
    if src_width == 0 || src_height == 0 || target_width == 0 {
        return None;
    }

    let width = even(src_width.min(target_width));
    let height = (src_height as f64 * width as f64 / src_width as f64).round() as u32;
    Some((width, even(height)))
}

fn even(value: u32) -> u32 {
    (value & !1).max(2)
}

// =============================================================================
// FFmpeg-backed Source
// =============================================================================

/// Frames decoded by an `ffmpeg` child writing rawvideo to a pipe.
///
/// Dropping the source before end of stream kills and reaps the child.
pub struct FFmpegFrameSource {
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    width: u32,
    height: u32,
    frame_rate: f64,
    next_index: FrameIndex,
    finished: bool,
}

impl FFmpegFrameSource {
    /// Probes `path` and starts decoding it at the analysis resolution.
    pub fn open(runner: &FFmpegRunner, path: &Path, target_width: u32) -> CoreResult<Self> {
        let probe = runner.probe(path)?;
        let video = probe.video.ok_or_else(|| {
            CoreError::DecodeFailure(format!("No video stream in {}", path.display()))
        })?;

        let (width, height) = scaled_dimensions(video.width, video.height, target_width)
            .ok_or_else(|| {
                CoreError::DecodeFailure(format!(
                    "Invalid video dimensions {}x{}",
                    video.width, video.height
                ))
            })?;

        tracing::debug!(
            "Decoding {} at {}x{} ({} fps reported)",
            path.display(),
            width,
            height,
            video.fps
        );

        let cmd = runner.frame_decoder(path, width, height);
        Self::spawn(cmd, width, height, video.fps)
    }

    /// Spawns an already configured decoder command.
    fn spawn(mut cmd: Command, width: u32, height: u32, reported_fps: f64) -> CoreResult<Self> {
        let mut child = cmd.spawn().map_err(|e| spawn_error("ffmpeg", e))?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CoreError::Internal("Decoder stdout not captured".into()));
            }
        };

        // Drain stderr on its own thread so a chatty decoder never blocks
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });

        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            stderr,
            width,
            height,
            frame_rate: effective_frame_rate(reported_fps),
            next_index: 0,
            finished: false,
        })
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * RGB_CHANNELS
    }

    /// Reaps the child after stdout closed and reports a failed exit.
    fn finish(&mut self) -> CoreResult<()> {
        self.finished = true;
        let status = self.child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(CoreError::DecodeFailure(format!(
                "ffmpeg exited with {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl FrameSource for FFmpegFrameSource {
    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn next_frame(&mut self) -> CoreResult<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        let mut data = vec![0u8; self.frame_len()];
        let filled = fill(&mut self.stdout, &mut data)?;

        if filled < data.len() {
            // A short read means end of stream; a trailing partial frame is dropped
            if filled > 0 {
                tracing::debug!("Dropping truncated final frame ({} bytes)", filled);
            }
            self.finish()?;
            return Ok(None);
        }

        let frame = Frame {
            index: self.next_index,
            width: self.width,
            height: self.height,
            data,
        };
        self.next_index += 1;
        Ok(Some(frame))
    }
}

impl Drop for FFmpegFrameSource {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
        // The detached stderr thread ends on its own once the pipe closes
    }
}

/// Reads until `buf` is full or the reader is exhausted.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// =============================================================================
// In-memory Source
// =============================================================================

/// Frame source over pre-built frames, used by analyzer tests.
#[cfg(test)]
pub(crate) struct MemoryFrameSource {
    frames: std::vec::IntoIter<Frame>,
    frame_rate: f64,
    /// Error returned after the frames run out, instead of end of stream
    trailing_error: Option<CoreError>,
}

#[cfg(test)]
impl MemoryFrameSource {
    pub(crate) fn new(frames: Vec<Frame>, frame_rate: f64) -> Self {
        Self {
            frames: frames.into_iter(),
            frame_rate: effective_frame_rate(frame_rate),
            trailing_error: None,
        }
    }

    /// `count` solid-colour 4x4 frames, colour chosen per index by `colour`.
    pub(crate) fn solid<F>(count: u64, frame_rate: f64, colour: F) -> Self
    where
        F: Fn(u64) -> [u8; 3],
    {
        let frames = (0..count)
            .map(|index| {
                let rgb = colour(index);
                Frame {
                    index,
                    width: 4,
                    height: 4,
                    data: rgb.iter().copied().cycle().take(4 * 4 * RGB_CHANNELS).collect(),
                }
            })
            .collect();
        Self::new(frames, frame_rate)
    }

    pub(crate) fn failing_after(mut self, error: CoreError) -> Self {
        self.trailing_error = Some(error);
        self
    }
}

#[cfg(test)]
impl FrameSource for MemoryFrameSource {
    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn next_frame(&mut self) -> CoreResult<Option<Frame>> {
        match self.frames.next() {
            Some(frame) => Ok(Some(frame)),
            None => match self.trailing_error.take() {
                Some(error) => Err(error),
                None => Ok(None),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;

    #[test]
    fn test_scaled_dimensions_keeps_aspect() {
        assert_eq!(scaled_dimensions(1920, 1080, 640), Some((640, 360)));
        assert_eq!(scaled_dimensions(320, 240, 640), Some((320, 240)));
    }

    #[test]
    fn test_scaled_dimensions_even() {
        let (w, h) = scaled_dimensions(1001, 563, 641).unwrap();
        assert_eq!(w % 2, 0);
        assert_eq!(h % 2, 0);
    }

    #[test]
    fn test_scaled_dimensions_rejects_empty() {
        assert_eq!(scaled_dimensions(0, 1080, 640), None);
        assert_eq!(scaled_dimensions(1920, 0, 640), None);
    }

    #[test]
    fn test_unknown_frame_rate_defaults() {
        let source = MemoryFrameSource::new(Vec::new(), 25.0);
        assert_eq!(source.frame_rate(), 25.0);

        let unknown_rate = MemoryFrameSource::new(Vec::new(), 0.0);
        assert_eq!(unknown_rate.frame_rate(), 30.0);
    }

    #[test]
    fn test_open_missing_input() {
        let runner = FFmpegRunner::new(crate::core::ffmpeg::FFmpegInfo::with_paths(
            "ffmpeg", "ffprobe",
        ));
        let result = FFmpegFrameSource::open(&runner, Path::new("/nonexistent/a.mp4"), 640);
        assert!(matches!(result, Err(CoreError::InputNotFound(_))));
    }

    #[cfg(unix)]
    fn shell(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", script])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    #[cfg(unix)]
    #[test]
    fn test_reads_whole_frames_from_pipe() {
        // 2x2 RGB frames are 12 bytes; 30 bytes = 2 frames + a partial one
        let cmd = shell("head -c 30 /dev/zero");
        let mut source = FFmpegFrameSource::spawn(cmd, 2, 2, 10.0).unwrap();

        let first = source.next_frame().unwrap().unwrap();
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(second.index, 1);
        assert_eq!(second.data.len(), 12);
        assert!(source.next_frame().unwrap().is_none());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_decoder_reports_stderr() {
        let cmd = shell("echo 'moov atom not found' >&2; exit 1");
        let mut source = FFmpegFrameSource::spawn(cmd, 2, 2, 10.0).unwrap();

        match source.next_frame() {
            Err(CoreError::DecodeFailure(msg)) => assert!(msg.contains("moov atom not found")),
            other => panic!("unexpected result: {:?}", other.map(|f| f.is_some())),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_drop_kills_endless_decoder() {
        let cmd = shell("exec cat /dev/zero");
        let mut source = FFmpegFrameSource::spawn(cmd, 2, 2, 10.0).unwrap();
        assert!(source.next_frame().unwrap().is_some());
        // Must return promptly instead of blocking on the child
        drop(source);
    }

    #[test]
    fn test_memory_source_trailing_error() {
        let mut source = MemoryFrameSource::solid(1, 30.0, |_| [0, 0, 0])
            .failing_after(CoreError::DecodeFailure("truncated".into()));
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().is_err());
    }
}
