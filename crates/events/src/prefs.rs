//! Per (user, kind) delivery preference resolution.

use std::time::Duration;

use tokio::sync::RwLock;

use relay_core::types::{DbId, Timestamp};
use relay_db::models::notification::NotificationPreference;
use relay_db::repositories::PreferenceRepo;
use relay_db::DbPool;

use crate::cache::TimedCache;

/// Upper bound on cached (user, kind) preference entries.
const CACHE_CAPACITY: usize = 8192;

/// Effective channel permissions for one (user, kind) pair.
///
/// Absence of a stored row means the defaults: web allowed, email and push
/// denied, not muted.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPrefs {
    pub allow_web: bool,
    pub allow_email: bool,
    pub allow_push: bool,
    pub mute_until: Option<Timestamp>,
}

impl Default for ChannelPrefs {
    fn default() -> Self {
        Self {
            allow_web: true,
            allow_email: false,
            allow_push: false,
            mute_until: None,
        }
    }
}

impl ChannelPrefs {
    /// Whether the pair is muted at `now`. The window is exclusive: a
    /// `mute_until` exactly equal to `now` is no longer muted.
    pub fn is_muted(&self, now: Timestamp) -> bool {
        self.mute_until.is_some_and(|until| until > now)
    }
}

impl From<NotificationPreference> for ChannelPrefs {
    fn from(row: NotificationPreference) -> Self {
        Self {
            allow_web: row.allow_web,
            allow_email: row.allow_email,
            allow_push: row.allow_push,
            mute_until: row.mute_until,
        }
    }
}

/// Preference lookups behind a bounded time-expiring cache.
///
/// There is no cross-process invalidation: a change made elsewhere becomes
/// visible here within one TTL window. Long-lived consumers (the streaming
/// loops) rely on that window being short rather than on a push signal.
pub struct PreferenceService {
    pool: DbPool,
    cache: RwLock<TimedCache<(DbId, String), ChannelPrefs>>,
    fail_open: bool,
}

impl PreferenceService {
    pub fn new(pool: DbPool, cache_ttl: Duration, fail_open: bool) -> Self {
        Self {
            pool,
            cache: RwLock::new(TimedCache::new(cache_ttl, CACHE_CAPACITY)),
            fail_open,
        }
    }

    /// Effective preferences for (user, kind), served from cache when fresh.
    ///
    /// A storage failure resolves to the configured failure posture: the
    /// defaults (deliver on web) when failing open, everything denied when
    /// failing closed. Failure outcomes are not cached.
    pub async fn get(&self, user_id: DbId, kind: &str) -> ChannelPrefs {
        let key = (user_id, kind.to_string());
        if let Some(cached) = self.cache.read().await.get(&key) {
            return cached;
        }

        match self.fetch(user_id, kind).await {
            Ok(prefs) => {
                self.cache.write().await.insert(key, prefs.clone());
                prefs
            }
            Err(e) => {
                tracing::error!(user_id, kind, error = %e, "Preference lookup failed");
                self.failure_prefs()
            }
        }
    }

    /// Effective preferences straight from storage, bypassing the cache.
    pub async fn get_fresh(&self, user_id: DbId, kind: &str) -> ChannelPrefs {
        match self.fetch(user_id, kind).await {
            Ok(prefs) => {
                let key = (user_id, kind.to_string());
                self.cache.write().await.insert(key, prefs.clone());
                prefs
            }
            Err(e) => {
                tracing::error!(user_id, kind, error = %e, "Preference lookup failed");
                self.failure_prefs()
            }
        }
    }

    /// Upsert a preference row and write through the cache.
    pub async fn set(
        &self,
        user_id: DbId,
        kind: &str,
        prefs: &ChannelPrefs,
    ) -> Result<NotificationPreference, sqlx::Error> {
        let row = PreferenceRepo::upsert(
            &self.pool,
            user_id,
            kind,
            prefs.allow_web,
            prefs.allow_email,
            prefs.allow_push,
            prefs.mute_until,
        )
        .await?;

        let key = (user_id, kind.to_string());
        self.cache
            .write()
            .await
            .insert(key, ChannelPrefs::from(row.clone()));
        Ok(row)
    }

    async fn fetch(&self, user_id: DbId, kind: &str) -> Result<ChannelPrefs, sqlx::Error> {
        let row = PreferenceRepo::get(&self.pool, user_id, kind).await?;
        Ok(row.map(ChannelPrefs::from).unwrap_or_default())
    }

    fn failure_prefs(&self) -> ChannelPrefs {
        if self.fail_open {
            ChannelPrefs::default()
        } else {
            ChannelPrefs {
                allow_web: false,
                allow_email: false,
                allow_push: false,
                mute_until: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    #[test]
    fn defaults_allow_web_only() {
        let prefs = ChannelPrefs::default();
        assert!(prefs.allow_web);
        assert!(!prefs.allow_email);
        assert!(!prefs.allow_push);
        assert!(prefs.mute_until.is_none());
    }

    #[test]
    fn mute_window_is_strictly_future() {
        let now = Utc::now();
        let mut prefs = ChannelPrefs::default();

        prefs.mute_until = Some(now + ChronoDuration::minutes(5));
        assert!(prefs.is_muted(now));

        prefs.mute_until = Some(now);
        assert!(!prefs.is_muted(now), "mute expiring exactly now is over");

        prefs.mute_until = Some(now - ChronoDuration::minutes(5));
        assert!(!prefs.is_muted(now));

        prefs.mute_until = None;
        assert!(!prefs.is_muted(now));
    }
}
