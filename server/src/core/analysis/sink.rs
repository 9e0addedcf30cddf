//! Producer/consumer plumbing for analysis streams.
//!
//! Each analysis runs on a blocking worker and pushes events into a bounded
//! channel. When the consumer goes away the next send fails, the producer
//! unwinds through `?`, and every scoped resource it holds is dropped.

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::AnalysisEvent;
use crate::core::CoreError;

/// The receiving side of a stream has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerGone;

/// Why an analyzer run stopped before finishing normally
#[derive(Debug)]
pub enum AnalysisAbort {
    /// Nobody is listening any more; stop quietly
    ConsumerGone,
    /// Terminal failure, reported to the consumer as one `error` event
    Failed(CoreError),
}

impl From<ConsumerGone> for AnalysisAbort {
    fn from(_: ConsumerGone) -> Self {
        AnalysisAbort::ConsumerGone
    }
}

impl From<CoreError> for AnalysisAbort {
    fn from(err: CoreError) -> Self {
        AnalysisAbort::Failed(err)
    }
}

impl From<std::io::Error> for AnalysisAbort {
    fn from(err: std::io::Error) -> Self {
        AnalysisAbort::Failed(err.into())
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisAbort>;

/// Producer handle used from the blocking worker
pub struct EventSink {
    tx: mpsc::Sender<AnalysisEvent>,
}

impl EventSink {
    /// Sends one event, waiting while the channel is full.
    pub fn emit(&self, event: AnalysisEvent) -> Result<(), ConsumerGone> {
        self.tx.blocking_send(event).map_err(|_| ConsumerGone)
    }

    /// Emits the terminal event of an analyzer run: its `done` event on
    /// success, a single `error` event on failure.
    pub fn finish(&self, outcome: AnalysisResult<AnalysisEvent>) -> Result<(), ConsumerGone> {
        match outcome {
            Ok(done) => self.emit(done),
            Err(AnalysisAbort::Failed(err)) => {
                tracing::warn!("Analysis failed: {}", err);
                self.emit(AnalysisEvent::error(&err))
            }
            Err(AnalysisAbort::ConsumerGone) => Err(ConsumerGone),
        }
    }
}

/// Consumer side of an analysis run
pub struct AnalysisStream {
    rx: mpsc::Receiver<AnalysisEvent>,
}

impl AnalysisStream {
    /// Runs `producer` on the blocking pool, buffering up to `capacity`
    /// events. Must be called from within a Tokio runtime.
    pub fn spawn<F>(capacity: usize, producer: F) -> Self
    where
        F: FnOnce(&EventSink) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::task::spawn_blocking(move || {
            let sink = EventSink { tx };
            producer(&sink);
        });
        Self { rx }
    }

    /// A stream that yields `event` and ends.
    #[cfg(test)]
    pub(crate) fn single(event: AnalysisEvent) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(event);
        Self { rx }
    }

    /// Next event, or `None` once the producer has finished.
    pub async fn next(&mut self) -> Option<AnalysisEvent> {
        self.rx.recv().await
    }

    /// Adapts the stream for SSE responses.
    pub fn into_stream(self) -> ReceiverStream<AnalysisEvent> {
        ReceiverStream::new(self.rx)
    }
}
