//! Handlers for the `/notifications` resource.
//!
//! Read endpoints require authentication via [`AuthUser`]; mutating
//! endpoints additionally require a valid anti-forgery token via
//! [`CsrfGuard`] and negotiate JSON-versus-redirect replies.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use relay_core::channels::CHANNEL_WEB;
use relay_core::error::CoreError;
use relay_core::roles::ROLE_ADMIN;
use relay_core::types::DbId;
use relay_db::models::notification::UpdatePreference;
use relay_db::models::subscription::{SubscribeRequest, UnsubscribeRequest};
use relay_db::repositories::{NotificationRepo, PreferenceRepo, SubscriptionRepo};
use relay_events::{ChannelPrefs, NewNotification};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::csrf::CsrfGuard;
use crate::response::{mutation_reply, DataResponse, ResponseMode};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query / request types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /notifications`.
#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    /// If `true`, return only unread notifications. Defaults to `false`.
    pub unread_only: Option<bool>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Body for `POST /notifications/broadcast`.
///
/// Exactly one targeting mode applies: an explicit directory user id list,
/// or an (event, entity) subscription lookup.
#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    /// Directory-wide user ids; resolved and deduplicated before emit.
    pub user_ids: Option<Vec<DbId>>,
    /// Subscription event name, e.g. `"note.comment"`.
    pub event: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub kind: String,
    pub title: String,
    pub body: Option<String>,
    pub link: Option<String>,
    pub payload: Option<serde_json::Value>,
}

/// Maximum page size for notification listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for notification listing.
const DEFAULT_LIMIT: i64 = 50;

/// Clamp the requested page shape into bounds.
fn clamp_page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

// ---------------------------------------------------------------------------
// Notification read endpoints
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications
///
/// List the authenticated user's notifications with optional filtering.
/// The response carries the current unread count alongside the page.
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let (limit, offset) = clamp_page(params.limit, params.offset);
    let unread_only = params.unread_only.unwrap_or(false);

    let items =
        NotificationRepo::list_for_user(&state.pool, auth.user_id, unread_only, limit, offset)
            .await?;
    let unread = NotificationRepo::unread_count(&state.pool, auth.user_id).await?;

    Ok(Json(serde_json::json!({
        "data": { "items": items, "unread": unread }
    })))
}

/// GET /api/v1/notifications/unread-count
///
/// Return the number of unread notifications for the authenticated user.
pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let count = NotificationRepo::unread_count(&state.pool, auth.user_id).await?;

    Ok(Json(serde_json::json!({
        "data": { "count": count }
    })))
}

// ---------------------------------------------------------------------------
// Notification mutations
// ---------------------------------------------------------------------------

/// POST /api/v1/notifications/{id}/read
///
/// Mark a single notification as read. The update is scoped to the owning
/// user, so another user's row yields 404 rather than a cross-user write.
pub async fn mark_read(
    csrf: CsrfGuard,
    mode: ResponseMode,
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<axum::response::Response> {
    let found =
        NotificationRepo::mark_read(&state.pool, notification_id, csrf.auth.user_id).await?;

    if !found {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Notification",
            id: notification_id,
        }));
    }

    let unread = NotificationRepo::unread_count(&state.pool, csrf.auth.user_id).await?;
    Ok(mutation_reply(
        mode,
        serde_json::json!({ "count": unread }),
        "Notification marked read",
    ))
}

/// POST /api/v1/notifications/read-all
///
/// Mark all of the authenticated user's notifications as read. Idempotent:
/// a second application is a no-op reporting zero marked.
pub async fn mark_all_read(
    csrf: CsrfGuard,
    mode: ResponseMode,
    State(state): State<AppState>,
) -> AppResult<axum::response::Response> {
    let count = NotificationRepo::mark_all_read(&state.pool, csrf.auth.user_id).await?;

    let flash = format!("{count} notifications marked read");
    Ok(mutation_reply(
        mode,
        serde_json::json!({ "count": count }),
        &flash,
    ))
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications/preferences
///
/// List the authenticated user's stored preference rows. Kinds without a
/// row fall back to the defaults client-side.
pub async fn get_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let preferences = PreferenceRepo::list_for_user(&state.pool, auth.user_id).await?;

    Ok(Json(serde_json::json!({
        "data": { "preferences": preferences }
    })))
}

/// PUT /api/v1/notifications/preferences/{kind}
///
/// Create or update the preference for a notification kind. Unset channel
/// flags keep their current effective value; `mute_until` always replaces
/// the stored window (null clears it).
pub async fn update_preference(
    csrf: CsrfGuard,
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(input): Json<UpdatePreference>,
) -> AppResult<Json<DataResponse<relay_db::models::notification::NotificationPreference>>> {
    let current = state.prefs.get_fresh(csrf.auth.user_id, &kind).await;

    let next = ChannelPrefs {
        allow_web: input.allow_web.unwrap_or(current.allow_web),
        allow_email: input.allow_email.unwrap_or(current.allow_email),
        allow_push: input.allow_push.unwrap_or(current.allow_push),
        mute_until: input.mute_until,
    };

    let row = state
        .prefs
        .set(csrf.auth.user_id, &kind, &next)
        .await
        .map_err(AppError::Database)?;

    Ok(Json(DataResponse { data: row }))
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications/subscriptions
///
/// List the authenticated user's subscriptions, including soft-disabled
/// rows (they are history, not deletions).
pub async fn list_subscriptions(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let subscriptions = SubscriptionRepo::list_for_user(&state.pool, auth.user_id).await?;

    Ok(Json(serde_json::json!({
        "data": { "subscriptions": subscriptions }
    })))
}

/// POST /api/v1/notifications/subscriptions
///
/// Subscribe to an (entity, event) pair. Re-subscribing re-enables the row
/// and replaces its channel set.
pub async fn subscribe(
    csrf: CsrfGuard,
    State(state): State<AppState>,
    Json(input): Json<SubscribeRequest>,
) -> AppResult<Json<serde_json::Value>> {
    if input.event.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "event must not be empty".into(),
        )));
    }

    let channels = input
        .channels
        .unwrap_or_else(|| vec![CHANNEL_WEB.to_string()]);
    let channels = serde_json::json!(channels);

    let subscription = SubscriptionRepo::upsert(
        &state.pool,
        csrf.auth.user_id,
        input.entity_type.as_deref(),
        input.entity_id,
        &input.event,
        &channels,
    )
    .await?;

    Ok(Json(serde_json::json!({ "data": subscription })))
}

/// DELETE /api/v1/notifications/subscriptions
///
/// Soft-disable a subscription. The row is retained for history, and
/// disabling an already-disabled or unknown subscription reports
/// `disabled: false` rather than failing.
pub async fn unsubscribe(
    csrf: CsrfGuard,
    State(state): State<AppState>,
    Json(input): Json<UnsubscribeRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let disabled = SubscriptionRepo::disable(
        &state.pool,
        csrf.auth.user_id,
        input.entity_type.as_deref(),
        input.entity_id,
        &input.event,
    )
    .await?;

    Ok(Json(serde_json::json!({ "data": { "disabled": disabled } })))
}

// ---------------------------------------------------------------------------
// Broadcast
// ---------------------------------------------------------------------------

/// POST /api/v1/notifications/broadcast
///
/// Admin-only fan-out entry point: emit a notification to an explicit list
/// of directory users, or to all enabled subscribers of an (event, entity)
/// pair. Per-recipient preference checks apply inside the emitter either
/// way.
pub async fn broadcast(
    csrf: CsrfGuard,
    State(state): State<AppState>,
    Json(input): Json<BroadcastRequest>,
) -> AppResult<Json<serde_json::Value>> {
    if csrf.auth.role != ROLE_ADMIN {
        return Err(AppError::Core(CoreError::Forbidden(
            "Broadcast requires the admin role".into(),
        )));
    }

    let mut template = NewNotification::new(0, &input.kind, &input.title)
        .with_actor(csrf.auth.user_id)
        .with_body(input.body.unwrap_or_default());
    if let Some(link) = input.link {
        template = template.with_link(link);
    }
    if let Some(payload) = input.payload {
        template = template.with_payload(payload);
    }
    if let (Some(entity_type), Some(entity_id)) = (&input.entity_type, input.entity_id) {
        template = template.with_entity(entity_type.clone(), entity_id);
    }

    let notification_ids = match (&input.user_ids, &input.event) {
        (Some(user_ids), _) => state.emitter.broadcast_to_users(user_ids, &template).await,
        (None, Some(event)) => {
            state
                .emitter
                .broadcast_to_subscribers(
                    event,
                    input.entity_type.as_deref(),
                    input.entity_id,
                    &template,
                )
                .await?
        }
        (None, None) => {
            return Err(AppError::Core(CoreError::Validation(
                "either user_ids or event must be provided".into(),
            )));
        }
    };

    Ok(Json(serde_json::json!({
        "data": { "notification_ids": notification_ids }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamping_applies_defaults_and_bounds() {
        assert_eq!(clamp_page(None, None), (50, 0));
        assert_eq!(clamp_page(Some(10), Some(20)), (10, 20));
        assert_eq!(clamp_page(Some(500), None), (100, 0));
        assert_eq!(clamp_page(Some(0), Some(-3)), (1, 0));
        assert_eq!(clamp_page(Some(-7), None), (1, 0));
    }
}
