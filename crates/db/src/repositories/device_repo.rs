//! Repository for the `devices` table.

use sqlx::PgPool;

use relay_core::types::DbId;

use crate::models::device::Device;

/// Column list for `devices` queries.
const COLUMNS: &str = "id, user_id, kind, fingerprint, user_agent, created_at, last_seen_at";

/// Provides device bookkeeping for push-capable browser sessions.
pub struct DeviceRepo;

impl DeviceRepo {
    /// Register a device or refresh its `last_seen_at` when the fingerprint
    /// already exists, returning the row either way.
    pub async fn upsert_touch(
        pool: &PgPool,
        user_id: DbId,
        kind: &str,
        fingerprint: &str,
        user_agent: Option<&str>,
    ) -> Result<Device, sqlx::Error> {
        let query = format!(
            "INSERT INTO devices (user_id, kind, fingerprint, user_agent) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (fingerprint) DO UPDATE SET \
                user_agent = EXCLUDED.user_agent, \
                last_seen_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Device>(&query)
            .bind(user_id)
            .bind(kind)
            .bind(fingerprint)
            .bind(user_agent)
            .fetch_one(pool)
            .await
    }

    /// Refresh `last_seen_at` for a known fingerprint.
    pub async fn touch(pool: &PgPool, fingerprint: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE devices SET last_seen_at = NOW() WHERE fingerprint = $1")
            .bind(fingerprint)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// List all devices registered for a user, most recently seen first.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Device>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM devices WHERE user_id = $1 ORDER BY last_seen_at DESC");
        sqlx::query_as::<_, Device>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}
