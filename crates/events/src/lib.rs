//! Relay notification core.
//!
//! This crate provides the write path and the supporting services the
//! delivery loops and the API build on:
//!
//! - [`IdentityResolver`] -- maps directory identities onto local users,
//!   provisioning shadow records when needed.
//! - [`PreferenceService`] -- per (user, kind) channel permissions and mute
//!   windows behind a bounded time-expiring cache.
//! - [`NotificationEmitter`] -- the single write path: preference checks,
//!   notification + fan-out row inserts, secondary-channel queueing, and the
//!   broadcast entry points.
//! - [`delivery`] -- secondary delivery channels (email, push).
//! - [`QueueDispatcher`] -- background service draining the channel queue.

pub mod cache;
pub mod delivery;
pub mod dispatcher;
pub mod emitter;
pub mod identity;
pub mod prefs;

pub use dispatcher::QueueDispatcher;
pub use emitter::{NewNotification, NotificationEmitter};
pub use identity::{Directory, IdentityResolver, PgDirectory};
pub use prefs::{ChannelPrefs, PreferenceService};
