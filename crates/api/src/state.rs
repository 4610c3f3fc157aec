use std::sync::Arc;

use relay_events::{IdentityResolver, NotificationEmitter, PreferenceService};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: relay_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Preference lookups behind the time-expiring cache; the streaming
    /// loops share this instance so mute changes surface within one TTL.
    pub prefs: Arc<PreferenceService>,
    /// Directory-to-local identity mapping.
    pub identity: Arc<IdentityResolver>,
    /// The notification write path, used by the broadcast endpoints and by
    /// in-process feature code.
    pub emitter: Arc<NotificationEmitter>,
}
