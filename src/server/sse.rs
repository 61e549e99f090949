// server/sse.rs — SSE bridge for review notifications.
//
// GET /events
//
// Streams review events as Server-Sent Events. The client subscribes to
// the daemon's broadcast channel; events emitted before the subscription
// are not replayed.

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures_util::stream;
use std::sync::Arc;
use std::time::Duration;

use crate::AppContext;

pub async fn review_events_sse(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    let rx = ctx.broadcaster.subscribe();

    let s = stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event_str) => {
                    let event: serde_json::Value = match serde_json::from_str(&event_str) {
                        Ok(v) => v,
                        Err(_) => continue,
                    };
                    let method = event
                        .get("method")
                        .and_then(|v| v.as_str())
                        .unwrap_or("event")
                        .to_string();
                    let sse_event = Event::default().data(event_str).event(method);
                    return Some((Ok::<Event, std::convert::Infallible>(sse_event), rx));
                }
                // Lagged subscribers skip ahead; a closed channel ends the stream.
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(s).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
