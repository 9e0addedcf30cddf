use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use neuralplay_lib::api::{self, AppState};
use neuralplay_lib::core::analysis::AnalysisEngine;
use neuralplay_lib::core::ffmpeg::{resolve_ffmpeg, FFmpegRunner};
use neuralplay_lib::core::models::{is_whisper_available, ModelRegistry};
use neuralplay_lib::core::settings::ServerSettings;
use neuralplay_lib::core::store::TranscriptStore;
use neuralplay_lib::{init_logging, ConsoleLog};

#[derive(Parser)]
#[command(name = "neuralplay", version, about = "NeuralPlay streaming video-analysis backend")]
struct Cli {
    /// Address to listen on (overrides config and NEURALPLAY_BIND)
    #[arg(long)]
    bind: Option<String>,

    /// JSON settings file (defaults to NEURALPLAY_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database for stored transcripts
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings =
        ServerSettings::load(cli.config.as_deref()).context("Failed to load settings")?;
    if let Some(bind) = cli.bind {
        settings.bind_address = bind;
    }
    if let Some(database) = cli.database {
        settings.database_path = database;
    }
    settings.normalize();

    init_logging(settings.log_dir.as_deref(), ConsoleLog::Stdout);
    if let Some(path) = ServerSettings::config_path(cli.config.as_deref(), |key| {
        std::env::var(key).ok()
    }) {
        tracing::info!("Loaded settings from {}", path.display());
    }

    let ffmpeg = resolve_ffmpeg(
        settings.ffmpeg_path.as_deref(),
        settings.ffprobe_path.as_deref(),
    );
    if !ffmpeg.is_available() {
        tracing::warn!(
            "ffmpeg not usable at {}; analysis routes will fail to decode",
            ffmpeg.ffmpeg_path.display()
        );
    }
    if !is_whisper_available() {
        tracing::info!("Built without Whisper; transcription routes will report it missing");
    }
    let models = Arc::new(ModelRegistry::from_settings(&settings.models));
    let engine = AnalysisEngine::new(
        FFmpegRunner::new(ffmpeg),
        models,
        settings.analysis.clone(),
    );

    let store = TranscriptStore::create(&settings.database_path).with_context(|| {
        format!(
            "Failed to open database {}",
            settings.database_path.display()
        )
    })?;

    let app = api::router(AppState::new(engine, store));

    let listener = tokio::net::TcpListener::bind(&settings.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_address))?;
    tracing::info!("NeuralPlay backend listening on {}", settings.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("NeuralPlay backend stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
