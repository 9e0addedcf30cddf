//! Server-sent event responses over analysis streams.

use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::{Stream, StreamExt};

use crate::core::analysis::AnalysisStream;

/// One `data:` line of JSON per event. Dropping the response drops the
/// receiver, which stops the producer at its next send.
pub fn event_stream(
    stream: AnalysisStream,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let events = stream
        .into_stream()
        .map(|event| Event::default().json_data(&event));
    Sse::new(events).keep_alive(KeepAlive::default())
}
