//! SSE event stream handler.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::IntervalStream;
use uipin_core::{BusEvent, SessionId, TaskId};

use crate::event_bus::Subscription;
use crate::http::responses::ErrorBody;
use crate::state::AppState;

const HEARTBEAT_PERIOD: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

fn sse_event(event: &BusEvent) -> Event {
    Event::default()
        .event(event.event_name())
        .json_data(event)
        .unwrap_or_else(|_| Event::default().event(event.event_name()))
}

/// Stream progress for one task+session pair as named SSE events.
///
/// The first frame is always a heartbeat so clients can confirm the stream
/// is live before any progress arrives; further heartbeats follow every
/// 15 seconds. Dropping the connection drops the bus subscription.
pub async fn task_events(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Response {
    let Some(session_id) = query.session_id.filter(|s| !s.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new(
                "taskId and sessionId query params are required",
            )),
        )
            .into_response();
    };

    let task_id = TaskId::new(task_id);
    let session_id = SessionId::new(session_id);
    let subscription = state.bus.subscribe(&task_id, &session_id);

    Sse::new(event_stream(subscription)).into_response()
}

fn event_stream(
    subscription: Subscription,
) -> impl futures_util::Stream<Item = Result<Event, Infallible>> {
    let initial = stream::once(async { sse_event(&BusEvent::heartbeat()) });

    // The subscription lives inside the unfold state, so it is dropped
    // (and unsubscribed) when the client disconnects.
    let bus_events = stream::unfold(subscription, |mut subscription| async move {
        subscription
            .recv()
            .await
            .map(|event| (sse_event(&event), subscription))
    });

    // interval_at skips the immediate first tick; the initial heartbeat is
    // sent explicitly above.
    let heartbeats = IntervalStream::new(tokio::time::interval_at(
        tokio::time::Instant::now() + HEARTBEAT_PERIOD,
        HEARTBEAT_PERIOD,
    ))
    .map(|_| sse_event(&BusEvent::heartbeat()));

    initial
        .chain(stream::select(bus_events, heartbeats))
        .map(Ok)
}
