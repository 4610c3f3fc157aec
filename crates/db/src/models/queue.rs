//! Channel queue entity model.

use serde::Serialize;
use sqlx::FromRow;

use relay_core::types::{DbId, Timestamp};

/// Queue item awaiting dispatch.
pub const QUEUE_PENDING: &str = "pending";
/// Queue item delivered successfully.
pub const QUEUE_SENT: &str = "sent";
/// Queue item abandoned after exhausting its attempts.
pub const QUEUE_FAILED: &str = "failed";

/// A row from the `channel_queue` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueueItem {
    pub id: DbId,
    pub notification_id: DbId,
    pub channel: String,
    pub status: String,
    pub scheduled_at: Timestamp,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
}
