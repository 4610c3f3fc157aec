//! Directory user entity model.

use sqlx::FromRow;

use relay_core::types::DbId;

/// A row from the read-only `directory_users` mirror.
///
/// The directory is authoritative for email and role; the local `users`
/// table is authoritative for notification ownership.
#[derive(Debug, Clone, FromRow)]
pub struct DirectoryUser {
    pub id: DbId,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub is_active: bool,
}
