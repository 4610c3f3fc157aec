//! Repository for the `notifications` and `notification_recipients` tables.

use sqlx::PgPool;

use relay_core::types::DbId;

use crate::models::notification::{FeedRow, Notification};

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, user_id, actor_user_id, kind, entity_type, entity_id, title, body, \
                       payload, link, is_read, read_at, created_at";

/// Input for a notification insert. Built by the emitter after the
/// preference checks have passed.
#[derive(Debug, Clone)]
pub struct InsertNotification<'a> {
    pub user_id: DbId,
    pub actor_user_id: Option<DbId>,
    pub kind: &'a str,
    pub entity_type: Option<&'a str>,
    pub entity_id: Option<DbId>,
    pub title: &'a str,
    pub body: &'a str,
    pub payload: &'a serde_json::Value,
    pub link: Option<&'a str>,
}

/// Provides CRUD operations for notifications and their fan-out records.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a notification row, returning the generated ID.
    pub async fn insert(pool: &PgPool, input: &InsertNotification<'_>) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO notifications \
                (user_id, actor_user_id, kind, entity_type, entity_id, title, body, payload, link) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id",
        )
        .bind(input.user_id)
        .bind(input.actor_user_id)
        .bind(input.kind)
        .bind(input.entity_type)
        .bind(input.entity_id)
        .bind(input.title)
        .bind(input.body)
        .bind(input.payload)
        .bind(input.link)
        .fetch_one(pool)
        .await
    }

    /// Insert a recipient fan-out record, returning its id (the cursor value
    /// streaming clients resume from).
    pub async fn insert_recipient(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO notification_recipients (notification_id, user_id) \
             VALUES ($1, $2) \
             RETURNING id",
        )
        .bind(notification_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Find a notification by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1");
        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List notifications for a user, newest first.
    ///
    /// When `unread_only` is `true`, only notifications with `is_read = false`
    /// are returned.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let filter = if unread_only {
            "AND is_read = false"
        } else {
            ""
        };
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE user_id = $1 {filter} \
             ORDER BY created_at DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Mark a single notification as read.
    ///
    /// The WHERE clause is scoped to the owning user, so a foreign id simply
    /// affects zero rows. Returns `true` if a row was updated.
    pub async fn mark_read(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = true, read_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND is_read = false",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark all unread notifications as read for a user.
    ///
    /// Idempotent: reapplying when nothing is unread affects zero rows.
    /// Returns the number of notifications that were marked.
    pub async fn mark_all_read(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = true, read_at = NOW() \
             WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Get the number of unread notifications for a user.
    pub async fn unread_count(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    /// Fetch recipient fan-out rows past a cursor, joined to their
    /// notifications, ordered ascending by cursor and capped at `limit`.
    ///
    /// This is the streaming loop's poll query; rows the loop chooses to
    /// skip are re-returned on the next poll because the cursor only
    /// advances past delivered rows.
    pub async fn feed_after(
        pool: &PgPool,
        user_id: DbId,
        cursor: DbId,
        limit: i64,
    ) -> Result<Vec<FeedRow>, sqlx::Error> {
        sqlx::query_as::<_, FeedRow>(
            "SELECT r.id AS cursor, n.id AS notification_id, n.kind, n.title, n.body, \
                    n.payload, n.link, n.created_at \
             FROM notification_recipients r \
             JOIN notifications n ON n.id = r.notification_id \
             WHERE r.user_id = $1 AND r.id > $2 \
             ORDER BY r.id ASC \
             LIMIT $3",
        )
        .bind(user_id)
        .bind(cursor)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Stamp `delivered_at` on a batch of recipient rows.
    ///
    /// Only rows not yet stamped are touched, so redelivery after an abrupt
    /// disconnect keeps the original delivery timestamp.
    pub async fn mark_delivered(pool: &PgPool, recipient_ids: &[DbId]) -> Result<(), sqlx::Error> {
        if recipient_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "UPDATE notification_recipients \
             SET delivered_at = NOW() \
             WHERE id = ANY($1) AND delivered_at IS NULL",
        )
        .bind(recipient_ids)
        .execute(pool)
        .await?;
        Ok(())
    }
}
