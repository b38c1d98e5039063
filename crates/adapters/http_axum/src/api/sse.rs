//! Server-Sent Events (SSE) stream of engine events.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::state::AppState;

/// `GET /api/events/stream`: SSE stream of engine events.
///
/// Each event is sent as a JSON `data:` frame. Events missed by a lagging
/// subscriber are dropped with a warning. The stream continues until the
/// client disconnects or the event bus is closed.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let event_rx = state.event_bus.subscribe();
    let event_stream = BroadcastStream::new(event_rx).filter_map(|result| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json) => Some(Ok(Event::default().data(json))),
            Err(err) => {
                tracing::warn!(%err, "failed to serialize event to JSON for SSE stream");
                None
            }
        },
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!(
                skipped = n,
                "SSE subscriber lagged, some events were dropped"
            );
            None
        }
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_state;

    #[tokio::test]
    async fn should_subscribe_to_event_bus_when_stream_created() {
        let state = spawn_state(vec![], &[]).await;
        let bus = state.event_bus.clone();
        let before = bus.receiver_count();

        let _sse_response = stream(State(state)).await;

        assert_eq!(bus.receiver_count(), before + 1);
    }
}
