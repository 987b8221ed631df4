//! Server-sent progress events.
//!
//! A running scan streams a `progress` event with the current snapshot,
//! then one per update, and ends after the terminal phase. A finished scan
//! gets a single `history` event.

use crate::server::routes_scan::parse_scan_id;
use crate::server::{ApiError, AppContext};
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tvshelf_common::Error;

pub fn sse_routes() -> Router<AppContext> {
    Router::new().route("/scans/:scan_id/events", get(scan_events))
}

fn json_event(name: &str, value: &impl Serialize) -> Event {
    Event::default()
        .event(name)
        .json_data(value)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

pub async fn scan_events(
    State(ctx): State<AppContext>,
    Path(scan_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let id = parse_scan_id(&scan_id)?;

    let subscription = ctx.scanner.subscribe(id);
    let history = match subscription {
        Some(_) => None,
        None => Some(
            ctx.scanner
                .get_scan_history(id)?
                .ok_or_else(|| Error::not_found(format!("scan {}", id)))?,
        ),
    };

    let stream = async_stream::stream! {
        if let Some(history) = history {
            yield Ok(json_event("history", &history));
            return;
        }
        let Some(mut sub) = subscription else { return };

        let done = sub.initial.phase.is_terminal();
        yield Ok(json_event("progress", &sub.initial));
        if done {
            return;
        }

        loop {
            match sub.updates.recv().await {
                Ok(progress) => {
                    let done = progress.phase.is_terminal();
                    yield Ok(json_event("progress", &progress));
                    if done {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::debug!(skipped = n, "Progress subscriber lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}
