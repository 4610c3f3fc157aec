//! Directory-to-local identity reconciliation.
//!
//! Notifications are foreign-keyed to the local `users` table, but callers
//! address recipients by their directory-wide id. [`IdentityResolver`] maps
//! one onto the other, lazily provisioning a shadow user when no local
//! account exists yet. The directory is authoritative for email and role;
//! the local store is authoritative for notification ownership, and the
//! reconciliation runs in that one direction only.

use std::sync::Arc;
use std::time::Duration;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use relay_core::roles::map_directory_role;
use relay_core::types::DbId;
use relay_db::models::directory::DirectoryUser;
use relay_db::models::user::CreateUser;
use relay_db::repositories::{DirectoryRepo, UserRepo};
use relay_db::DbPool;

use crate::cache::TimedCache;

/// Error type for directory collaborator failures.
pub type DirectoryError = Box<dyn std::error::Error + Send + Sync>;

/// The external directory collaborator.
///
/// The production implementation reads the database mirror; tests provide
/// in-memory fakes.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Fetch the directory record for a directory-wide user id.
    async fn fetch(&self, id: DbId) -> Result<Option<DirectoryUser>, DirectoryError>;
}

/// Directory implementation backed by the `directory_users` mirror table.
pub struct PgDirectory {
    pool: DbPool,
}

impl PgDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn fetch(&self, id: DbId) -> Result<Option<DirectoryUser>, DirectoryError> {
        Ok(DirectoryRepo::find_by_id(&self.pool, id).await?)
    }
}

/// Upper bound on cached identity mappings.
const CACHE_CAPACITY: usize = 4096;

/// Maps directory user ids onto local user ids.
///
/// All outcomes -- including "no mapping" -- are cached with a TTL so
/// repeated directory calls stay bounded while a directory-side change
/// still becomes visible within one TTL window.
pub struct IdentityResolver {
    pool: DbPool,
    directory: Arc<dyn Directory>,
    cache: RwLock<TimedCache<DbId, Option<DbId>>>,
}

impl IdentityResolver {
    pub fn new(pool: DbPool, directory: Arc<dyn Directory>, cache_ttl: Duration) -> Self {
        Self {
            pool,
            directory,
            cache: RwLock::new(TimedCache::new(cache_ttl, CACHE_CAPACITY)),
        }
    }

    /// Resolve a directory-wide user id to a local user id.
    ///
    /// Resolution order:
    /// 1. the id already names a local user;
    /// 2. the directory record's email matches a local user;
    /// 3. a shadow user is provisioned from the directory record.
    ///
    /// Returns `None` when the directory has no record or provisioning
    /// fails; either way the outcome is cached and the caller skips the
    /// recipient.
    pub async fn resolve(&self, directory_user_id: DbId) -> Option<DbId> {
        if let Some(cached) = self.cache.read().await.get(&directory_user_id) {
            return cached;
        }

        let resolved = self.resolve_uncached(directory_user_id).await;
        self.cache.write().await.insert(directory_user_id, resolved);
        resolved
    }

    /// Resolve a batch, dropping unresolvable entries and deduplicating the
    /// result while preserving first-seen order.
    pub async fn resolve_many(&self, directory_user_ids: &[DbId]) -> Vec<DbId> {
        let mut resolved = Vec::with_capacity(directory_user_ids.len());
        for &id in directory_user_ids {
            if let Some(local_id) = self.resolve(id).await {
                if !resolved.contains(&local_id) {
                    resolved.push(local_id);
                }
            }
        }
        resolved
    }

    async fn resolve_uncached(&self, directory_user_id: DbId) -> Option<DbId> {
        // Treat the input as already-local first.
        match UserRepo::find_by_id(&self.pool, directory_user_id).await {
            Ok(Some(user)) => return Some(user.id),
            Ok(None) => {}
            Err(e) => {
                tracing::error!(directory_user_id, error = %e, "Local user lookup failed");
                return None;
            }
        }

        let record = match self.directory.fetch(directory_user_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!(directory_user_id, "No directory record, skipping recipient");
                return None;
            }
            Err(e) => {
                tracing::error!(directory_user_id, error = %e, "Directory unavailable");
                return None;
            }
        };

        match UserRepo::find_by_email(&self.pool, &record.email).await {
            Ok(Some(user)) => return Some(user.id),
            Ok(None) => {}
            Err(e) => {
                tracing::error!(directory_user_id, error = %e, "Local email lookup failed");
                return None;
            }
        }

        self.provision_shadow(&record).await
    }

    /// Provision a local shadow user for a directory record.
    ///
    /// The password placeholder is an argon2 hash of a random UUID, so the
    /// shadow account satisfies the schema without being sign-in capable
    /// until a real credential flow claims it.
    async fn provision_shadow(&self, record: &DirectoryUser) -> Option<DbId> {
        let placeholder = match hash_placeholder_password() {
            Ok(hash) => hash,
            Err(e) => {
                tracing::error!(directory_user_id = record.id, error = %e, "Password placeholder hashing failed");
                return None;
            }
        };

        let input = CreateUser {
            username: record.email.clone(),
            email: record.email.clone(),
            password_hash: placeholder,
            role: map_directory_role(&record.role).to_string(),
        };

        match UserRepo::create(&self.pool, &input).await {
            Ok(user) => {
                tracing::info!(
                    directory_user_id = record.id,
                    local_user_id = user.id,
                    "Provisioned shadow user"
                );
                Some(user.id)
            }
            Err(e) => {
                tracing::error!(directory_user_id = record.id, error = %e, "Shadow provisioning failed");
                None
            }
        }
    }
}

/// Argon2id-hash a random unguessable placeholder password.
fn hash_placeholder_password() -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(Uuid::new_v4().to_string().as_bytes(), &salt)?;
    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_password_is_phc_formatted_and_unique() {
        let a = hash_placeholder_password().expect("hashing should succeed");
        let b = hash_placeholder_password().expect("hashing should succeed");
        assert!(a.starts_with("$argon2id$"), "expected argon2id PHC prefix");
        assert_ne!(a, b, "two placeholders must never collide");
    }
}
