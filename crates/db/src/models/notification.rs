//! Notification entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use relay_core::types::{DbId, Timestamp};

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    pub actor_user_id: Option<DbId>,
    pub kind: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub title: String,
    pub body: String,
    pub payload: serde_json::Value,
    pub link: Option<String>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// A recipient fan-out row joined to its notification, as consumed by the
/// streaming delivery loop.
///
/// `cursor` is the recipient row's BIGSERIAL id: strictly increasing within
/// a user's stream, never reused, and fed back by clients to resume.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FeedRow {
    pub cursor: DbId,
    pub notification_id: DbId,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub payload: serde_json::Value,
    pub link: Option<String>,
    pub created_at: Timestamp,
}

/// A row from the `notification_preferences` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationPreference {
    pub id: DbId,
    pub user_id: DbId,
    pub kind: String,
    pub allow_web: bool,
    pub allow_email: bool,
    pub allow_push: bool,
    pub mute_until: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for upserting a notification preference.
#[derive(Debug, Deserialize)]
pub struct UpdatePreference {
    pub allow_web: Option<bool>,
    pub allow_email: Option<bool>,
    pub allow_push: Option<bool>,
    pub mute_until: Option<Timestamp>,
}
