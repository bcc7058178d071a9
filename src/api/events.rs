use std::convert::Infallible;

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::engine::EngineError;
use crate::model::ResourceId;

use super::AppState;
use super::error::ApiError;

/// Server-sent stream of ledger changes touching one computer.
pub async fn computer_events(
    State(state): State<AppState>,
    path: Result<Path<ResourceId>, PathRejection>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let Path(id) = path?;
    if !state.engine.registry.exists(id) {
        return Err(EngineError::UnknownResource(id).into());
    }
    let rx = state.engine.notify.subscribe(id);

    let stream = futures::stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let frame = match SseEvent::default().event(event.name()).json_data(&event) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!("computer {id}: dropping unserializable event: {e}");
                            continue;
                        }
                    };
                    return Some((Ok(frame), rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("computer {id}: event subscriber lagged, {skipped} event(s) skipped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
