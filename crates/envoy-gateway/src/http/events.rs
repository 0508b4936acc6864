//! GET /events?sessionId=... — server-sent events for one session.
//!
//! Opens with a `connected` event carrying the session id, then forwards
//! every event the agent loop emits on the bus for that session verbatim
//! as JSON. The agent loop itself is not affected by whether anyone is
//! listening: a turn already underway completes and persists regardless
//! of whether this connection is still open.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures_util::stream::Stream;
use serde::Deserialize;

use crate::app::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    session_id: String,
}

pub async fn events_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let session_id = query.session_id;
    let subscription = state.bus.subscribe(&session_id);
    let bus = state.bus.clone();

    let connected = envoy_bus::Event::Connected { session_id: session_id.clone() };
    let stream = async_stream::stream! {
        yield to_sse(&connected);

        let mut subscription = subscription;
        while let Some(event) = subscription.receiver.recv().await {
            yield to_sse(&event);
        }

        bus.unsubscribe(&subscription.session_id, subscription.id);
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse(event: &envoy_bus::Event) -> Result<SseEvent, Infallible> {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Ok(SseEvent::default().event("message").data(payload))
}
