//! Device entity model.

use serde::Serialize;
use sqlx::FromRow;

use relay_core::types::{DbId, Timestamp};

/// A row from the `devices` table, identifying a push-capable browser
/// session by its deterministic fingerprint.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Device {
    pub id: DbId,
    pub user_id: DbId,
    pub kind: String,
    pub fingerprint: String,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
    pub last_seen_at: Timestamp,
}
