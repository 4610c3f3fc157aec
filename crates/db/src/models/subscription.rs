//! Subscription entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use relay_core::types::{DbId, Timestamp};

/// A row from the `subscriptions` table.
///
/// `entity_type`/`entity_id` may both be NULL for a global subscription to
/// an event class.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Subscription {
    pub id: DbId,
    pub user_id: DbId,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub event: String,
    pub is_enabled: bool,
    pub channels: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating or re-enabling a subscription.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub event: String,
    /// Channel names; defaults to `["web"]` when omitted.
    pub channels: Option<Vec<String>>,
}

/// DTO for soft-disabling a subscription.
#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub event: String,
}
