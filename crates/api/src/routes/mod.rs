//! Route tree construction.

pub mod health;
pub mod notification;

use axum::Router;

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /notifications                        list (?unread_only, limit, offset)
/// /notifications/unread-count           unread count (GET)
/// /notifications/read-all               mark all read (POST, CSRF)
/// /notifications/{id}/read              mark read (POST, CSRF)
/// /notifications/preferences            list preferences (GET)
/// /notifications/preferences/{kind}     update preference (PUT, CSRF)
/// /notifications/subscriptions          list, subscribe, unsubscribe (GET, POST, DELETE; CSRF on writes)
/// /notifications/broadcast              admin fan-out (POST, CSRF)
/// /notifications/stream                 live delivery stream (GET, SSE)
/// /notifications/stream/unread          unread-count stream (GET, SSE)
/// ```
///
/// Unmatched paths under `/api/v1` answer 400 rather than 404: the caller
/// named an action this API does not recognize.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/notifications", notification::router())
        .fallback(bad_action)
}

/// Fallback for unrecognized API actions.
async fn bad_action() -> AppError {
    AppError::BadRequest("Unrecognized API action".into())
}
