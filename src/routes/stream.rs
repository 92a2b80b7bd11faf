use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;

use crate::app_state::AppState;

/// GET /api/v1/stream/{session_id}: live progress of an automation run.
///
/// Connect before posting the run with the same `streamSessionId`. The
/// stream ends after the run's `completed` event.
pub async fn stream_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let events = state.streams.connect(&session_id);

    let stream = futures::stream::unfold(events, |mut events| async move {
        let event = events.recv().await?;
        Some((Event::default().json_data(&event), events))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
