//! Audio Sample Loading
//!
//! Reads the 16kHz mono WAV windows produced by the decoder into normalized
//! f32 samples for the speech model.

use std::path::Path;

use crate::core::ffmpeg::TRANSCRIPTION_SAMPLE_RATE;
use crate::core::{CoreError, CoreResult};

/// Loads audio samples from a WAV file as f32 samples normalized to [-1.0, 1.0].
///
/// The file must be mono at [`TRANSCRIPTION_SAMPLE_RATE`] with 16 or 32 bit
/// integer samples; anything else is a [`CoreError::DecodeFailure`].
pub fn load_audio_samples(wav_path: &Path) -> CoreResult<Vec<f32>> {
    let reader = hound::WavReader::open(wav_path)
        .map_err(|e| CoreError::DecodeFailure(format!("Failed to open WAV file: {}", e)))?;

    let spec = reader.spec();

    if spec.sample_rate != TRANSCRIPTION_SAMPLE_RATE {
        return Err(CoreError::DecodeFailure(format!(
            "Expected 16kHz sample rate, got {} Hz",
            spec.sample_rate
        )));
    }

    if spec.channels != 1 {
        return Err(CoreError::DecodeFailure(format!(
            "Expected mono audio, got {} channels",
            spec.channels
        )));
    }

    // A bad sample fails the window; skipping it would shift later audio
    let samples: Vec<f32> = match spec.bits_per_sample {
        16 => reader
            .into_samples::<i16>()
            .map(|s| s.map(|s| s as f32 / 32768.0))
            .collect::<Result<_, _>>()
            .map_err(sample_error)?,
        32 => reader
            .into_samples::<i32>()
            .map(|s| s.map(|s| s as f32 / 2147483648.0))
            .collect::<Result<_, _>>()
            .map_err(sample_error)?,
        bits => {
            return Err(CoreError::DecodeFailure(format!(
                "Unsupported bit depth: {}",
                bits
            )));
        }
    };

    Ok(samples)
}

fn sample_error(err: hound::Error) -> CoreError {
    CoreError::DecodeFailure(format!("Failed to read WAV samples: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames * channels as usize {
            let sample = ((i as f32 / 100.0).sin() * 16000.0) as i16;
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_audio_samples_file_not_found() {
        let result = load_audio_samples(Path::new("/nonexistent/audio.wav"));
        assert!(matches!(result, Err(CoreError::DecodeFailure(_))));
    }

    #[test]
    fn test_load_audio_samples_valid_wav() {
        let temp_dir = TempDir::new().unwrap();
        let wav_path = temp_dir.path().join("chunk.wav");
        write_wav(&wav_path, 1, 16000, 1600);

        let samples = load_audio_samples(&wav_path).unwrap();
        assert_eq!(samples.len(), 1600);
        assert!(samples.iter().all(|&s| (-1.0..=1.0).contains(&s)));
    }

    #[test]
    fn test_load_audio_wrong_sample_rate() {
        let temp_dir = TempDir::new().unwrap();
        let wav_path = temp_dir.path().join("wrong_rate.wav");
        write_wav(&wav_path, 1, 44100, 1);

        let err = load_audio_samples(&wav_path).unwrap_err();
        assert!(err.to_string().contains("16kHz"));
    }

    #[test]
    fn test_load_audio_wrong_channels() {
        let temp_dir = TempDir::new().unwrap();
        let wav_path = temp_dir.path().join("stereo.wav");
        write_wav(&wav_path, 2, 16000, 1);

        let err = load_audio_samples(&wav_path).unwrap_err();
        assert!(err.to_string().contains("mono"));
    }

    #[test]
    fn test_truncated_samples_fail_the_window() {
        let temp_dir = TempDir::new().unwrap();
        let wav_path = temp_dir.path().join("truncated.wav");
        write_wav(&wav_path, 1, 16000, 1600);

        // Cut the last sample in half; the header still announces 1600
        let len = std::fs::metadata(&wav_path).unwrap().len();
        let file = std::fs::OpenOptions::new().write(true).open(&wav_path).unwrap();
        file.set_len(len - 1).unwrap();

        match load_audio_samples(&wav_path) {
            Err(CoreError::DecodeFailure(_)) => {}
            other => panic!("expected DecodeFailure, got {:?}", other.map(|s| s.len())),
        }
    }
}
