//! Route definitions for the `/notifications` resource.
//!
//! All endpoints require authentication; mutations also require the
//! anti-forgery token.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::notification;
use crate::state::AppState;
use crate::stream;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /                      -> list_notifications
/// GET    /unread-count          -> unread_count
/// POST   /read-all              -> mark_all_read
/// POST   /{id}/read             -> mark_read
///
/// GET    /preferences           -> get_preferences
/// PUT    /preferences/{kind}    -> update_preference
///
/// GET    /subscriptions         -> list_subscriptions
/// POST   /subscriptions         -> subscribe
/// DELETE /subscriptions         -> unsubscribe
///
/// POST   /broadcast             -> broadcast (admin)
///
/// GET    /stream                -> SSE delivery stream
/// GET    /stream/unread         -> SSE unread-count stream
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        // Core notification endpoints
        .route("/", get(notification::list_notifications))
        .route("/unread-count", get(notification::unread_count))
        .route("/read-all", post(notification::mark_all_read))
        .route("/{id}/read", post(notification::mark_read))
        // Preferences endpoints
        .route("/preferences", get(notification::get_preferences))
        .route("/preferences/{kind}", put(notification::update_preference))
        // Subscription registry
        .route(
            "/subscriptions",
            get(notification::list_subscriptions)
                .post(notification::subscribe)
                .delete(notification::unsubscribe),
        )
        // Admin fan-out
        .route("/broadcast", post(notification::broadcast))
        // Live streams
        .route("/stream", get(stream::feed::stream_feed))
        .route("/stream/unread", get(stream::counter::stream_unread))
}
