//! NeuralPlay Core Library
//!
//! Streaming video-analysis backend for the NeuralPlay annotation app.
//! The analysis pipeline lives in [`core`]; the HTTP/SSE surface in `api`
//! is compiled with the `server` feature.

pub mod core;

#[cfg(feature = "server")]
pub mod api;

use std::path::Path;
use std::sync::OnceLock;

use tracing_subscriber::fmt::writer::BoxMakeWriter;

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Where console log lines go
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleLog {
    Stdout,
    /// Keeps stdout free for machine-readable output
    Stderr,
}

/// Installs the global tracing subscriber.
///
/// Console output always; a daily-rolling `neuralplay.log` as well when
/// `log_dir` is given. `RUST_LOG` directives are honoured on top of INFO.
pub fn init_logging(log_dir: Option<&Path>, console: ConsoleLog) {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let writer = match console {
        ConsoleLog::Stdout => BoxMakeWriter::new(std::io::stdout),
        ConsoleLog::Stderr => BoxMakeWriter::new(std::io::stderr),
    };
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(cfg!(debug_assertions));

    let file_layer = log_dir.and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Cannot create log directory {}: {}", dir.display(), e);
            return None;
        }
        let file_appender = tracing_appender::rolling::daily(dir, "neuralplay.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer);

    // Avoid panics if already initialized (tests, embedding hosts).
    let _ = tracing::subscriber::set_global_default(subscriber);
}
