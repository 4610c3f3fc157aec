//! The lighter-weight unread-count stream.
//!
//! Polls only the unread count and pushes a `count` frame whenever the
//! value differs from the last observed one, heartbeating otherwise. Shares
//! the feed loop's bounded-duration/reconnect discipline.

use std::convert::Infallible;
use std::time::Instant;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use relay_core::types::DbId;
use relay_db::repositories::NotificationRepo;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::stream::heartbeat_event;

/// Buffered frames per connection.
const FRAME_BUFFER: usize = 16;

/// GET /api/v1/notifications/stream/unread
///
/// Long-lived SSE stream of unread-count changes for the caller.
pub async fn stream_unread(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Sse<ReceiverStream<Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(FRAME_BUFFER);
    tokio::spawn(run_count_loop(state, auth.user_id, tx));

    Sse::new(ReceiverStream::new(rx))
}

/// Frame an unread count as a `count` event.
fn count_event(count: i64) -> Event {
    Event::default()
        .event("count")
        .data(serde_json::json!({ "count": count }).to_string())
}

/// Terminal frame for the counter stream.
fn count_bye_event(count: Option<i64>) -> Event {
    Event::default()
        .event("bye")
        .data(serde_json::json!({ "count": count }).to_string())
}

async fn run_count_loop(
    state: AppState,
    user_id: DbId,
    tx: mpsc::Sender<Result<Event, Infallible>>,
) {
    let stream_cfg = state.config.stream.clone();
    let deadline = Instant::now() + stream_cfg.budget;
    let mut ticker = tokio::time::interval(stream_cfg.poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut last_seen: Option<i64> = None;

    loop {
        if Instant::now() >= deadline {
            break;
        }
        ticker.tick().await;

        match NotificationRepo::unread_count(&state.pool, user_id).await {
            Ok(count) if last_seen != Some(count) => {
                if tx.send(Ok(count_event(count))).await.is_err() {
                    return;
                }
                last_seen = Some(count);
            }
            Ok(_) => {
                if tx.send(Ok(heartbeat_event())).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                // Transient by policy: retry on the next poll.
                tracing::warn!(user_id, error = %e, "Unread count poll failed");
            }
        }
    }

    let _ = tx.send(Ok(count_bye_event(last_seen))).await;
}
