//! The `/events` live process-event stream, backed by the broadcast channel
//! every `LiveStreamPublisher` forwards envelopes into.

use crate::bootstrap::EngineContext;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

pub fn router() -> axum::Router<EngineContext> {
    axum::Router::new().route("/events", axum::routing::get(stream))
}

async fn stream(
    State(ctx): State<EngineContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = ctx.sse.subscribe();
    let events = BroadcastStream::new(receiver).filter_map(|item| match item {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        // A lagging client skips the messages it missed rather than closing.
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(_)) => None,
    });

    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
