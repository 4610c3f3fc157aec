//! Repository for the read-only `directory_users` mirror.

use sqlx::PgPool;

use relay_core::types::DbId;

use crate::models::directory::DirectoryUser;

const COLUMNS: &str = "id, email, display_name, role, is_active";

/// Read-only access to the directory mirror.
pub struct DirectoryRepo;

impl DirectoryRepo {
    /// Fetch a directory record by its directory-wide id.
    ///
    /// Inactive directory accounts are treated as absent so a deactivated
    /// identity stops resolving without a local cleanup pass.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<DirectoryUser>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM directory_users WHERE id = $1 AND is_active = true");
        sqlx::query_as::<_, DirectoryUser>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
