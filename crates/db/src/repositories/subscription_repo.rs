//! Repository for the `subscriptions` table.
//!
//! Entity fields use three-valued matching: a NULL `entity_type`/`entity_id`
//! is a global subscription to an event class, and both-null counts as equal
//! for upsert and lookup purposes (`IS NOT DISTINCT FROM`).

use sqlx::PgPool;

use relay_core::types::DbId;

use crate::models::subscription::Subscription;

/// Column list for `subscriptions` queries.
const COLUMNS: &str =
    "id, user_id, entity_type, entity_id, event, is_enabled, channels, created_at, updated_at";

/// Provides CRUD operations for subscriptions.
pub struct SubscriptionRepo;

impl SubscriptionRepo {
    /// Insert or update a subscription: re-subscribing re-enables the row
    /// and replaces its channel set.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        entity_type: Option<&str>,
        entity_id: Option<DbId>,
        event: &str,
        channels: &serde_json::Value,
    ) -> Result<Subscription, sqlx::Error> {
        let query = format!(
            "INSERT INTO subscriptions (user_id, entity_type, entity_id, event, is_enabled, channels) \
             VALUES ($1, $2, $3, $4, true, $5) \
             ON CONFLICT (user_id, COALESCE(entity_type, ''), COALESCE(entity_id, 0), event) \
             DO UPDATE SET \
                is_enabled = true, \
                channels = EXCLUDED.channels, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(user_id)
            .bind(entity_type)
            .bind(entity_id)
            .bind(event)
            .bind(channels)
            .fetch_one(pool)
            .await
    }

    /// Soft-disable a subscription. The row is retained for history.
    ///
    /// Returns `true` if a matching enabled row was disabled.
    pub async fn disable(
        pool: &PgPool,
        user_id: DbId,
        entity_type: Option<&str>,
        entity_id: Option<DbId>,
        event: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE subscriptions \
             SET is_enabled = false, updated_at = NOW() \
             WHERE user_id = $1 \
               AND entity_type IS NOT DISTINCT FROM $2 \
               AND entity_id IS NOT DISTINCT FROM $3 \
               AND event = $4 \
               AND is_enabled = true",
        )
        .bind(user_id)
        .bind(entity_type)
        .bind(entity_id)
        .bind(event)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List all subscriptions for a user, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Subscription>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC");
        sqlx::query_as::<_, Subscription>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// List enabled subscriptions matching the exact (event, entity) triple,
    /// including the both-null global case.
    pub async fn list_enabled_for_event(
        pool: &PgPool,
        event: &str,
        entity_type: Option<&str>,
        entity_id: Option<DbId>,
    ) -> Result<Vec<Subscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subscriptions \
             WHERE event = $1 \
               AND entity_type IS NOT DISTINCT FROM $2 \
               AND entity_id IS NOT DISTINCT FROM $3 \
               AND is_enabled = true \
             ORDER BY id"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(event)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(pool)
            .await
    }
}
