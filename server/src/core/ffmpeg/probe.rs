//! FFprobe output parsing.

use serde::Serialize;

use crate::core::{CoreError, CoreResult};

/// What the analyzers need to know about a media file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaProbe {
    /// Container duration in seconds, when reported
    pub duration_sec: Option<f64>,
    /// First video stream, if any
    pub video: Option<VideoStream>,
    /// Whether the file carries at least one audio stream
    pub has_audio: bool,
}

/// Geometry and rate of a video stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoStream {
    pub width: u32,
    pub height: u32,
    /// Frames per second; 0.0 when the container does not say
    pub fps: f64,
}

/// Parse FFprobe JSON output (`-print_format json -show_format -show_streams`)
pub fn parse_probe_output(json_str: &str) -> CoreResult<MediaProbe> {
    let json: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| CoreError::DecodeFailure(format!("Failed to parse FFprobe output: {}", e)))?;

    let duration_sec = json
        .get("format")
        .and_then(|f| f.get("duration"))
        .and_then(|d| d.as_str())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    let streams = json
        .get("streams")
        .and_then(|s| s.as_array())
        .cloned()
        .unwrap_or_default();

    let mut video = None;
    let mut has_audio = false;

    for stream in &streams {
        match stream.get("codec_type").and_then(|c| c.as_str()) {
            Some("video") if video.is_none() => video = Some(parse_video_stream(stream)),
            Some("audio") => has_audio = true,
            _ => {}
        }
    }

    Ok(MediaProbe {
        duration_sec,
        video,
        has_audio,
    })
}

fn parse_video_stream(stream: &serde_json::Value) -> VideoStream {
    let width = stream.get("width").and_then(|w| w.as_u64()).unwrap_or(0) as u32;
    let height = stream.get("height").and_then(|h| h.as_u64()).unwrap_or(0) as u32;

    // avg_frame_rate reflects the decoded cadence; r_frame_rate is the fallback
    let fps = ["avg_frame_rate", "r_frame_rate"]
        .iter()
        .filter_map(|key| stream.get(*key).and_then(|f| f.as_str()))
        .filter_map(parse_rate)
        .find(|fps| *fps > 0.0)
        .unwrap_or(0.0);

    VideoStream { width, height, fps }
}

/// Parses "30000/1001" or "25" style rates.
fn parse_rate(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den > 0.0 {
                Some(num / den)
            } else {
                None
            }
        }
        None => s.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output_video() {
        let json = r#"{
            "format": {
                "duration": "10.5",
                "size": "1048576",
                "format_name": "mov,mp4,m4a,3gp,3g2,mj2"
            },
            "streams": [
                {
                    "codec_type": "video",
                    "codec_name": "h264",
                    "width": 1920,
                    "height": 1080,
                    "r_frame_rate": "30/1",
                    "avg_frame_rate": "30/1"
                },
                {
                    "codec_type": "audio",
                    "codec_name": "aac",
                    "sample_rate": "48000",
                    "channels": 2
                }
            ]
        }"#;

        let probe = parse_probe_output(json).unwrap();
        assert_eq!(probe.duration_sec, Some(10.5));
        assert!(probe.has_audio);

        let video = probe.video.unwrap();
        assert_eq!(video.width, 1920);
        assert_eq!(video.height, 1080);
        assert_eq!(video.fps, 30.0);
    }

    #[test]
    fn test_parse_fractional_framerate() {
        let json = r#"{
            "format": { "duration": "1.0" },
            "streams": [
                { "codec_type": "video", "width": 640, "height": 360,
                  "avg_frame_rate": "0/0", "r_frame_rate": "30000/1001" }
            ]
        }"#;

        let video = parse_probe_output(json).unwrap().video.unwrap();
        // 30000/1001 ≈ 29.97
        assert!((video.fps - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_audio_only_file() {
        let json = r#"{
            "format": { "duration": "N/A" },
            "streams": [ { "codec_type": "audio" } ]
        }"#;

        let probe = parse_probe_output(json).unwrap();
        assert!(probe.video.is_none());
        assert!(probe.has_audio);
        assert!(probe.duration_sec.is_none());
    }

    #[test]
    fn test_garbage_is_decode_failure() {
        assert!(matches!(
            parse_probe_output("not json"),
            Err(CoreError::DecodeFailure(_))
        ));
    }
}
