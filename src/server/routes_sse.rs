//! Library progress stream.

use crate::server::AppContext;
use crate::state::Event as LibraryEvent;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

pub fn sse_routes() -> Router<AppContext> {
    Router::new()
        .route("/library/events", get(events_handler))
        .route("/library/events/recent", get(recent_events))
}

/// Event as sent to clients: the tagged payload plus a display line.
#[derive(Debug, Serialize)]
pub struct EventMessage<'a> {
    #[serde(flatten)]
    pub event: &'a LibraryEvent,
    pub message: String,
}

impl<'a> From<&'a LibraryEvent> for EventMessage<'a> {
    fn from(event: &'a LibraryEvent) -> Self {
        Self {
            message: event.payload.status_message(),
            event,
        }
    }
}

pub async fn events_handler(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = ctx.events.subscribe();

    // Lagged receivers skip the dropped events.
    let stream = BroadcastStream::new(rx)
        .filter_map(|result| result.ok())
        .map(|event: LibraryEvent| {
            let data = serde_json::to_string(&EventMessage::from(&event)).unwrap_or_else(|e| {
                format!(r#"{{"error": "serialization failed: {}"}}"#, e)
            });
            Ok(Event::default().data(data))
        });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping"))
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_recent_limit")]
    pub limit: usize,
}

fn default_recent_limit() -> usize {
    50
}

/// Most recent events, newest first.
async fn recent_events(
    State(ctx): State<AppContext>,
    Query(query): Query<RecentQuery>,
) -> Json<Vec<serde_json::Value>> {
    let events = ctx.events.recent_events(query.limit);
    Json(
        events
            .iter()
            .filter_map(|e| serde_json::to_value(EventMessage::from(e)).ok())
            .collect(),
    )
}
