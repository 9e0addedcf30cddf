//! Headless NeuralPlay analysis.
//!
//! Runs the same streaming analyzers as the HTTP server and prints each
//! event as one JSON line, or the folded result with `--aggregate`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use neuralplay_lib::core::analysis::aggregate::{
    emotions_of, fold_events, objects_of, scene_of, segment_of,
};
use neuralplay_lib::core::analysis::{
    AnalysisEngine, AnalysisEvent, EmotionDetection, ObjectDetection, SceneBoundary,
    TranscriptData,
};
use neuralplay_lib::core::ffmpeg::{resolve_ffmpeg, FFmpegRunner};
use neuralplay_lib::core::models::ModelRegistry;
use neuralplay_lib::core::settings::ServerSettings;
use neuralplay_lib::core::CoreResult;
use neuralplay_lib::{init_logging, ConsoleLog};

#[derive(Parser)]
#[command(name = "neuralplay-cli", version, about = "Headless NeuralPlay video analysis")]
struct Cli {
    /// JSON settings file (defaults to NEURALPLAY_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the vision inference sidecar
    #[arg(long, global = true)]
    vision_url: Option<String>,

    /// Whisper ggml model file
    #[arg(long, global = true)]
    whisper_model: Option<PathBuf>,

    /// Print the folded result instead of one event per line
    #[arg(long, global = true)]
    aggregate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe speech in fixed-length windows
    Transcribe {
        path: PathBuf,
        /// Window length in seconds
        #[arg(long)]
        chunk_duration: Option<f64>,
    },
    /// Detect scene cuts
    Scenes { path: PathBuf },
    /// Label objects at a fixed sampling interval
    Objects {
        path: PathBuf,
        #[arg(long)]
        interval: Option<f64>,
    },
    /// Recognize facial emotions at a fixed sampling interval
    Emotions {
        path: PathBuf,
        #[arg(long)]
        interval: Option<f64>,
    },
    /// Scenes, objects and emotions in sequence
    Analyze { path: PathBuf },
}

#[derive(Serialize)]
struct AnalyzeSummary {
    scenes: Vec<SceneBoundary>,
    detections: Vec<ObjectDetection>,
    emotions: Vec<EmotionDetection>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut settings =
        ServerSettings::load(cli.config.as_deref()).context("Failed to load settings")?;
    if let Some(url) = cli.vision_url {
        settings.models.vision_url = Some(url);
    }
    if let Some(model) = cli.whisper_model {
        settings.models.whisper_model_path = Some(model);
    }
    settings.normalize();

    // stdout carries the JSON output
    init_logging(settings.log_dir.as_deref(), ConsoleLog::Stderr);
    if let Some(path) = ServerSettings::config_path(cli.config.as_deref(), |key| {
        std::env::var(key).ok()
    }) {
        tracing::info!("Loaded settings from {}", path.display());
    }

    let ffmpeg = resolve_ffmpeg(
        settings.ffmpeg_path.as_deref(),
        settings.ffprobe_path.as_deref(),
    );
    let engine = AnalysisEngine::new(
        FFmpegRunner::new(ffmpeg),
        Arc::new(ModelRegistry::from_settings(&settings.models)),
        settings.analysis.clone(),
    );

    let (fold, mut stream) = match cli.command {
        Command::Transcribe {
            path,
            chunk_duration,
        } => (Fold::Transcript, engine.transcribe(path, chunk_duration)),
        Command::Scenes { path } => (Fold::Scenes, engine.scenes(path)),
        Command::Objects { path, interval } => (Fold::Objects, engine.objects(path, interval)),
        Command::Emotions { path, interval } => (Fold::Emotions, engine.emotions(path, interval)),
        Command::Analyze { path } => (Fold::All, engine.analyze_all(path)),
    };

    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        if !cli.aggregate {
            println!("{}", serde_json::to_string(&event)?);
        }
        events.push(event);
    }

    let failed = events
        .iter()
        .any(|e| matches!(e, AnalysisEvent::Error { .. }));
    if cli.aggregate {
        let output = match fold.apply(events) {
            Ok(value) => serde_json::to_string_pretty(&value)?,
            Err(e) => serde_json::json!({ "error": e.to_string() }).to_string(),
        };
        println!("{}", output);
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// How `--aggregate` folds the events of each subcommand
#[derive(Clone, Copy)]
enum Fold {
    Transcript,
    Scenes,
    Objects,
    Emotions,
    All,
}

impl Fold {
    /// Folds into JSON, or the first error of the stream.
    fn apply(self, events: Vec<AnalysisEvent>) -> CoreResult<serde_json::Value> {
        match self {
            Fold::Transcript => {
                to_json(&TranscriptData::from_segments(fold_events(events, segment_of)?))
            }
            Fold::Scenes => to_json(&fold_events(events, scene_of)?),
            Fold::Objects => to_json(&fold_events(events, objects_of)?),
            Fold::Emotions => to_json(&fold_events(events, emotions_of)?),
            Fold::All => to_json(&AnalyzeSummary {
                scenes: fold_events(events.clone(), scene_of)?,
                detections: fold_events(events.clone(), objects_of)?,
                emotions: fold_events(events, emotions_of)?,
            }),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> CoreResult<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use neuralplay_lib::core::analysis::Segment;
    use neuralplay_lib::core::{CoreError, ErrorKind};

    fn scene(id: u32) -> AnalysisEvent {
        AnalysisEvent::Scene(SceneBoundary {
            id,
            start: 0.0,
            end: 2.0,
            duration: 2.0,
            confidence: None,
        })
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::parse_from(["neuralplay-cli", "objects", "a.mp4", "--interval", "1.5"]);
        assert!(!cli.aggregate);
        assert!(matches!(
            cli.command,
            Command::Objects { interval: Some(i), .. } if i == 1.5
        ));

        let cli = Cli::parse_from(["neuralplay-cli", "--aggregate", "transcribe", "a.mp4"]);
        assert!(cli.aggregate);
        assert!(matches!(cli.command, Command::Transcribe { chunk_duration: None, .. }));
    }

    #[test]
    fn test_fold_transcript() {
        let events = vec![
            AnalysisEvent::Segment {
                data: Segment::new(0.0, 1.0, "Hello"),
            },
            AnalysisEvent::done("Transcription complete", 1),
        ];
        let value = Fold::Transcript.apply(events).unwrap();
        assert_eq!(value["text"], "Hello");
    }

    #[test]
    fn test_fold_all_groups_payloads() {
        let events = vec![
            scene(1),
            scene(2),
            AnalysisEvent::Complete {
                message: "All analysis complete".into(),
            },
        ];
        let value = Fold::All.apply(events).unwrap();
        assert_eq!(value["scenes"].as_array().unwrap().len(), 2);
        assert!(value["detections"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_fold_reports_first_error() {
        let events = vec![
            scene(1),
            AnalysisEvent::error(&CoreError::InputNotFound("a.mp4".into())),
        ];
        let err = Fold::Scenes.apply(events).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputNotFound);
    }
}
