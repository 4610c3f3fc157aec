//! The per-connection notification delivery loop.
//!
//! State machine per connection: CONNECTING (authenticate, register device,
//! resolve cursor, ack) -> STREAMING (poll, filter, push, stamp delivery) ->
//! CLOSING (`bye` after the wall-clock budget or on disconnect).

use std::convert::Infallible;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use relay_core::types::DbId;
use relay_db::models::notification::FeedRow;
use relay_db::repositories::NotificationRepo;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::stream::{bye_event, device, hello_event, heartbeat_event, resolve_cursor};

/// Query parameters for the streaming endpoints.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Explicit resume cursor; `Last-Event-ID` wins when both are present.
    pub cursor: Option<DbId>,
}

/// Buffered frames per connection before backpressure applies.
const FRAME_BUFFER: usize = 64;

/// GET /api/v1/notifications/stream
///
/// Long-lived SSE stream of the caller's notifications past the resume
/// cursor. The connection self-terminates after the configured budget with
/// a `bye` frame so the client reconnects with its advanced cursor.
pub async fn stream_feed(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<StreamQuery>,
    headers: HeaderMap,
) -> Sse<ReceiverStream<Result<Event, Infallible>>> {
    let cursor = resolve_cursor(&headers, params.cursor);
    let fingerprint =
        device::register_device(&state.pool, auth.user_id, &auth.session_id, &headers).await;

    let (tx, rx) = mpsc::channel(FRAME_BUFFER);
    tokio::spawn(run_feed_loop(state, auth.user_id, fingerprint, cursor, tx));

    Sse::new(ReceiverStream::new(rx))
}

/// JSON body of a `notify` frame.
fn notify_payload(row: &FeedRow) -> serde_json::Value {
    serde_json::json!({
        "id": row.cursor,
        "notification_id": row.notification_id,
        "kind": row.kind,
        "title": row.title,
        "body": row.body,
        "link": row.link,
        "payload": row.payload,
        "created_at": row.created_at,
    })
}

/// Frame a feed row as a `notify` event.
///
/// The frame id is the fan-out row id; clients feed it back as
/// `Last-Event-ID` to resume past this row.
fn notify_event(row: &FeedRow) -> Event {
    Event::default()
        .id(row.cursor.to_string())
        .event("notify")
        .data(notify_payload(row).to_string())
}

/// The STREAMING phase, run as a detached task per connection.
///
/// Send failures mean the peer went away; the loop ends quietly. Storage
/// errors are transient by policy: logged, then retried on the next tick.
async fn run_feed_loop(
    state: AppState,
    user_id: DbId,
    fingerprint: String,
    mut cursor: DbId,
    tx: mpsc::Sender<Result<Event, Infallible>>,
) {
    if tx.send(Ok(hello_event(cursor))).await.is_err() {
        return;
    }

    let stream_cfg = state.config.stream.clone();
    let deadline = Instant::now() + stream_cfg.budget;
    let mut ticker = tokio::time::interval(stream_cfg.poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_touch = Instant::now();

    loop {
        if Instant::now() >= deadline {
            break;
        }
        ticker.tick().await;

        match NotificationRepo::feed_after(&state.pool, user_id, cursor, stream_cfg.batch_size)
            .await
        {
            Ok(rows) if rows.is_empty() => {
                // Nothing new; keep intermediaries from timing us out.
                if tx.send(Ok(heartbeat_event())).await.is_err() {
                    return;
                }
            }
            Ok(rows) => {
                let mut delivered: Vec<DbId> = Vec::with_capacity(rows.len());
                let now = Utc::now();

                for row in &rows {
                    // Live preference re-check: a user who muted mid-flight
                    // stops receiving rows that were already queued.
                    let prefs = state.prefs.get(user_id, &row.kind).await;
                    if !prefs.allow_web || prefs.is_muted(now) {
                        // Stop before the skipped row so the cursor never
                        // advances past it; it stays eligible for
                        // redelivery once unmuted.
                        break;
                    }

                    if tx.send(Ok(notify_event(row))).await.is_err() {
                        // Peer disconnected mid-batch. Rows already pushed
                        // still get their delivery stamp below.
                        stamp_delivered(&state, &delivered).await;
                        return;
                    }
                    delivered.push(row.cursor);
                    cursor = row.cursor;
                }

                stamp_delivered(&state, &delivered).await;
            }
            Err(e) => {
                // Transient by policy: retry on the next poll.
                tracing::warn!(user_id, error = %e, "Feed poll failed");
            }
        }

        if last_touch.elapsed() >= super::DEVICE_TOUCH_INTERVAL {
            device::touch_device(&state.pool, &fingerprint).await;
            last_touch = Instant::now();
        }
    }

    let _ = tx.send(Ok(bye_event(cursor))).await;
}

/// Stamp `delivered_at` on pushed rows. A failed stamp only delays the
/// timestamp to a later redelivery; it never surfaces to the client.
async fn stamp_delivered(state: &AppState, delivered: &[DbId]) {
    if delivered.is_empty() {
        return;
    }
    if let Err(e) = NotificationRepo::mark_delivered(&state.pool, delivered).await {
        tracing::warn!(error = %e, "Delivery stamp failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> FeedRow {
        FeedRow {
            cursor: 101,
            notification_id: 55,
            kind: "note.comment".into(),
            title: "New comment".into(),
            body: "hi".into(),
            payload: serde_json::json!({"note_id": 42}),
            link: Some("/notes/42".into()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn notify_payload_carries_cursor_as_id() {
        let data = notify_payload(&sample_row());
        assert_eq!(data["id"], 101);
        assert_eq!(data["notification_id"], 55);
        assert_eq!(data["kind"], "note.comment");
        assert_eq!(data["link"], "/notes/42");
        assert_eq!(data["payload"]["note_id"], 42);
    }

    #[test]
    fn notify_payload_keeps_absent_link_null() {
        let mut row = sample_row();
        row.link = None;
        let data = notify_payload(&row);
        assert!(data["link"].is_null());
    }
}
