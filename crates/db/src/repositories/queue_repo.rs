//! Repository for the `channel_queue` table.

use sqlx::PgPool;

use relay_core::types::{DbId, Timestamp};

use crate::models::queue::{QueueItem, QUEUE_FAILED, QUEUE_PENDING, QUEUE_SENT};

/// Column list for `channel_queue` queries.
const COLUMNS: &str =
    "id, notification_id, channel, status, scheduled_at, attempts, last_error, created_at";

/// Provides queue operations for secondary-channel work items.
pub struct QueueRepo;

impl QueueRepo {
    /// Enqueue a pending work item for a notification and channel,
    /// returning the generated ID.
    pub async fn enqueue(
        pool: &PgPool,
        notification_id: DbId,
        channel: &str,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO channel_queue (notification_id, channel) \
             VALUES ($1, $2) \
             RETURNING id",
        )
        .bind(notification_id)
        .bind(channel)
        .fetch_one(pool)
        .await
    }

    /// List due pending items, oldest first.
    ///
    /// A concurrent dispatcher could pick up the same item; a duplicate
    /// secondary delivery is the accepted worst case, mirroring the
    /// idempotency posture of the rest of the write path.
    pub async fn claim_due(pool: &PgPool, limit: i64) -> Result<Vec<QueueItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM channel_queue \
             WHERE status = '{QUEUE_PENDING}' AND scheduled_at <= NOW() \
             ORDER BY scheduled_at ASC \
             LIMIT $1"
        );
        sqlx::query_as::<_, QueueItem>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Mark an item as delivered.
    pub async fn mark_sent(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        let query =
            format!("UPDATE channel_queue SET status = '{QUEUE_SENT}', last_error = NULL WHERE id = $1");
        sqlx::query(&query).bind(id).execute(pool).await?;
        Ok(())
    }

    /// Record a failed attempt and reschedule the item for a later retry.
    pub async fn reschedule(
        pool: &PgPool,
        id: DbId,
        error: &str,
        next_attempt_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE channel_queue \
             SET attempts = attempts + 1, last_error = $2, scheduled_at = $3 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .bind(next_attempt_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a final failed attempt and abandon the item.
    pub async fn mark_failed(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        let query = format!(
            "UPDATE channel_queue \
             SET status = '{QUEUE_FAILED}', attempts = attempts + 1, last_error = $2 \
             WHERE id = $1"
        );
        sqlx::query(&query).bind(id).bind(error).execute(pool).await?;
        Ok(())
    }

    /// Count pending items for a notification.
    pub async fn pending_count(pool: &PgPool, notification_id: DbId) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM channel_queue \
             WHERE notification_id = $1 AND status = '{QUEUE_PENDING}'"
        );
        let count: Option<i64> = sqlx::query_scalar(&query)
            .bind(notification_id)
            .fetch_one(pool)
            .await?;
        Ok(count.unwrap_or(0))
    }
}
