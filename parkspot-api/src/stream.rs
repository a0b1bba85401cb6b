use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/lots/{lot_id}/stream", get(lot_stream))
}

/// Live reserve/release notifications for one lot. Slow subscribers that
/// lag behind the channel silently skip the missed events; clients refetch
/// the grid on reconnect.
async fn lot_stream(
    State(state): State<AppState>,
    Path(lot_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    state.service.registry().get_lot(&lot_id)?;
    let rx = state.service.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.belongs_to_lot(&lot_id) => {
            Some(Event::default().event(event.kind.as_str()).json_data(&event))
        }
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("SSE subscriber for lot {} lagged: {}", lot_id, e);
            None
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
