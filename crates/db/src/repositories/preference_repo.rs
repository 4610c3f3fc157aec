//! Repository for the `notification_preferences` table.

use sqlx::PgPool;

use relay_core::types::{DbId, Timestamp};

use crate::models::notification::NotificationPreference;

/// Column list for `notification_preferences` queries.
const COLUMNS: &str = "id, user_id, kind, allow_web, allow_email, allow_push, mute_until, \
                       created_at, updated_at";

/// Provides CRUD operations for per-(user, kind) channel preferences.
pub struct PreferenceRepo;

impl PreferenceRepo {
    /// Get the preference row for a specific user and notification kind.
    ///
    /// Absence of a row means defaults apply (web allowed, email/push
    /// denied, not muted) -- that interpretation lives in the preference
    /// service, not here.
    pub async fn get(
        pool: &PgPool,
        user_id: DbId,
        kind: &str,
    ) -> Result<Option<NotificationPreference>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM notification_preferences WHERE user_id = $1 AND kind = $2");
        sqlx::query_as::<_, NotificationPreference>(&query)
            .bind(user_id)
            .bind(kind)
            .fetch_optional(pool)
            .await
    }

    /// List all preference rows for a user, ordered by kind.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<NotificationPreference>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_preferences WHERE user_id = $1 ORDER BY kind"
        );
        sqlx::query_as::<_, NotificationPreference>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Insert or update a preference in a single round-trip.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        kind: &str,
        allow_web: bool,
        allow_email: bool,
        allow_push: bool,
        mute_until: Option<Timestamp>,
    ) -> Result<NotificationPreference, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_preferences \
                (user_id, kind, allow_web, allow_email, allow_push, mute_until) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (user_id, kind) DO UPDATE SET \
                allow_web = EXCLUDED.allow_web, \
                allow_email = EXCLUDED.allow_email, \
                allow_push = EXCLUDED.allow_push, \
                mute_until = EXCLUDED.mute_until, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationPreference>(&query)
            .bind(user_id)
            .bind(kind)
            .bind(allow_web)
            .bind(allow_email)
            .bind(allow_push)
            .bind(mute_until)
            .fetch_one(pool)
            .await
    }
}
