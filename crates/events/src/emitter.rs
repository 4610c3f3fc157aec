//! The notification write path.
//!
//! [`NotificationEmitter::emit`] is the only place notification rows come
//! into existence; the broadcast entry points fan out over users or
//! subscribers and funnel through it, so preference and mute enforcement
//! live in exactly one spot.

use std::sync::Arc;

use chrono::Utc;

use relay_core::channels::{parse_channel_list, CHANNEL_EMAIL, CHANNEL_PUSH, CHANNEL_WEB};
use relay_core::types::{DbId, Timestamp};
use relay_db::repositories::notification_repo::InsertNotification;
use relay_db::repositories::{NotificationRepo, QueueRepo, SubscriptionRepo};
use relay_db::DbPool;

use crate::identity::IdentityResolver;
use crate::prefs::{ChannelPrefs, PreferenceService};

// ---------------------------------------------------------------------------
// NewNotification
// ---------------------------------------------------------------------------

/// A notification about to be emitted.
///
/// Constructed via [`NewNotification::new`] and enriched with the builder
/// methods; `recipient` is a **local** user id -- directory ids are resolved
/// at the broadcast boundary, never here.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient: DbId,
    pub actor_user_id: Option<DbId>,
    /// Dot-separated kind tag, e.g. `"note.comment"`.
    pub kind: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub title: String,
    pub body: String,
    pub payload: serde_json::Value,
    pub link: Option<String>,
}

impl NewNotification {
    /// Create a notification with only the required fields.
    pub fn new(recipient: DbId, kind: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            recipient,
            actor_user_id: None,
            kind: kind.into(),
            entity_type: None,
            entity_id: None,
            title: title.into(),
            body: String::new(),
            payload: serde_json::Value::Object(Default::default()),
            link: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Clone this notification re-targeted at another recipient.
    pub fn for_recipient(&self, recipient: DbId) -> Self {
        let mut n = self.clone();
        n.recipient = recipient;
        n
    }
}

// ---------------------------------------------------------------------------
// Channel decision
// ---------------------------------------------------------------------------

/// Channels an emit will actually use, after preferences and any
/// subscription channel mask have been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChannelDecision {
    web: bool,
    email: bool,
    push: bool,
}

/// Resolve the effective channels for one delivery.
///
/// Returns `None` when the (user, kind) pair is muted at `now` -- full
/// suppression, nothing is written. A `mask` (a subscription's channel
/// list) is necessary-but-not-sufficient: a channel must appear in the mask
/// AND be allowed by preference.
fn decide_channels(
    prefs: &ChannelPrefs,
    mask: Option<&[String]>,
    now: Timestamp,
) -> Option<ChannelDecision> {
    if prefs.is_muted(now) {
        return None;
    }

    let in_mask = |channel: &str| mask.is_none_or(|m| m.iter().any(|c| c.as_str() == channel));

    Some(ChannelDecision {
        web: prefs.allow_web && in_mask(CHANNEL_WEB),
        email: prefs.allow_email && in_mask(CHANNEL_EMAIL),
        push: prefs.allow_push && in_mask(CHANNEL_PUSH),
    })
}

// ---------------------------------------------------------------------------
// NotificationEmitter
// ---------------------------------------------------------------------------

/// The single write path for notifications.
pub struct NotificationEmitter {
    pool: DbPool,
    prefs: Arc<PreferenceService>,
    identity: Arc<IdentityResolver>,
}

impl NotificationEmitter {
    pub fn new(pool: DbPool, prefs: Arc<PreferenceService>, identity: Arc<IdentityResolver>) -> Self {
        Self {
            pool,
            prefs,
            identity,
        }
    }

    /// Emit a single notification.
    ///
    /// Returns `Ok(None)` when delivery was fully suppressed (mute window,
    /// or web channel disallowed); otherwise the new notification id.
    ///
    /// Secondary channels ride on the web row's existence: queue items need
    /// a notification id to attach to, so when web is disallowed there is no
    /// id and email/push are likewise skipped for this delivery.
    pub async fn emit(&self, notification: &NewNotification) -> Result<Option<DbId>, sqlx::Error> {
        self.emit_with_channels(notification, None).await
    }

    /// Emit with an optional channel mask (a subscription's channel list).
    pub async fn emit_with_channels(
        &self,
        notification: &NewNotification,
        mask: Option<&[String]>,
    ) -> Result<Option<DbId>, sqlx::Error> {
        let prefs = self
            .prefs
            .get(notification.recipient, &notification.kind)
            .await;

        let Some(decision) = decide_channels(&prefs, mask, Utc::now()) else {
            tracing::debug!(
                user_id = notification.recipient,
                kind = %notification.kind,
                "Delivery suppressed by mute window"
            );
            return Ok(None);
        };

        if !decision.web {
            return Ok(None);
        }

        let input = InsertNotification {
            user_id: notification.recipient,
            actor_user_id: notification.actor_user_id,
            kind: &notification.kind,
            entity_type: notification.entity_type.as_deref(),
            entity_id: notification.entity_id,
            title: &notification.title,
            body: &notification.body,
            payload: &notification.payload,
            link: notification.link.as_deref(),
        };
        let notification_id = NotificationRepo::insert(&self.pool, &input).await?;
        NotificationRepo::insert_recipient(&self.pool, notification_id, notification.recipient)
            .await?;

        if decision.email {
            QueueRepo::enqueue(&self.pool, notification_id, CHANNEL_EMAIL).await?;
        }
        if decision.push {
            QueueRepo::enqueue(&self.pool, notification_id, CHANNEL_PUSH).await?;
        }

        tracing::debug!(
            notification_id,
            user_id = notification.recipient,
            kind = %notification.kind,
            email = decision.email,
            push = decision.push,
            "Notification emitted"
        );

        Ok(Some(notification_id))
    }

    /// Broadcast to an explicit list of directory user ids.
    ///
    /// Ids are resolved (and deduplicated) through the identity resolver;
    /// unresolvable entries and per-user emit failures are logged and
    /// skipped, never aborting the batch. Returns the created notification
    /// ids.
    pub async fn broadcast_to_users(
        &self,
        directory_user_ids: &[DbId],
        template: &NewNotification,
    ) -> Vec<DbId> {
        let recipients = self.identity.resolve_many(directory_user_ids).await;

        let mut created = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            match self.emit(&template.for_recipient(recipient)).await {
                Ok(Some(id)) => created.push(id),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(user_id = recipient, error = %e, "Broadcast emit failed for user");
                }
            }
        }
        created
    }

    /// Broadcast to all enabled subscribers of an (event, entity) pair.
    ///
    /// The subscription's channel list caps which channels each delivery may
    /// use; the subscriber's own type preference still applies inside the
    /// emit, so a subscription is necessary but not sufficient.
    pub async fn broadcast_to_subscribers(
        &self,
        event: &str,
        entity_type: Option<&str>,
        entity_id: Option<DbId>,
        template: &NewNotification,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let subscriptions =
            SubscriptionRepo::list_enabled_for_event(&self.pool, event, entity_type, entity_id)
                .await?;

        let mut created = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            let channels = parse_channel_list(&subscription.channels);
            match self
                .emit_with_channels(
                    &template.for_recipient(subscription.user_id),
                    Some(&channels),
                )
                .await
            {
                Ok(Some(id)) => created.push(id),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(
                        user_id = subscription.user_id,
                        event,
                        error = %e,
                        "Broadcast emit failed for subscriber"
                    );
                }
            }
        }
        Ok(created)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn owned(channels: &[&str]) -> Vec<String> {
        channels.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn future_mute_suppresses_everything() {
        let now = Utc::now();
        let prefs = ChannelPrefs {
            allow_web: true,
            allow_email: true,
            allow_push: true,
            mute_until: Some(now + Duration::minutes(10)),
        };
        assert_eq!(decide_channels(&prefs, None, now), None);
    }

    #[test]
    fn expired_mute_no_longer_suppresses() {
        let now = Utc::now();
        let prefs = ChannelPrefs {
            mute_until: Some(now - Duration::minutes(10)),
            ..ChannelPrefs::default()
        };
        let decision = decide_channels(&prefs, None, now).expect("not muted");
        assert!(decision.web);
    }

    #[test]
    fn defaults_decide_web_only() {
        let decision =
            decide_channels(&ChannelPrefs::default(), None, Utc::now()).expect("not muted");
        assert!(decision.web);
        assert!(!decision.email);
        assert!(!decision.push);
    }

    #[test]
    fn mask_restricts_allowed_channels() {
        let prefs = ChannelPrefs {
            allow_web: true,
            allow_email: true,
            allow_push: true,
            mute_until: None,
        };
        let mask = owned(&["web", "push"]);
        let decision = decide_channels(&prefs, Some(&mask), Utc::now()).expect("not muted");
        assert!(decision.web);
        assert!(!decision.email, "email is not in the subscription mask");
        assert!(decision.push);
    }

    #[test]
    fn mask_cannot_grant_what_preferences_deny() {
        let mask = owned(&["web", "email", "push"]);
        let decision =
            decide_channels(&ChannelPrefs::default(), Some(&mask), Utc::now()).expect("not muted");
        assert!(decision.web);
        assert!(!decision.email, "preference still denies email");
        assert!(!decision.push, "preference still denies push");
    }

    #[test]
    fn builder_sets_all_fields() {
        let n = NewNotification::new(7, "note.comment", "New comment")
            .with_body("hi")
            .with_actor(3)
            .with_entity("note", 42)
            .with_payload(serde_json::json!({"note_id": 42}))
            .with_link("/notes/42");

        assert_eq!(n.recipient, 7);
        assert_eq!(n.kind, "note.comment");
        assert_eq!(n.title, "New comment");
        assert_eq!(n.body, "hi");
        assert_eq!(n.actor_user_id, Some(3));
        assert_eq!(n.entity_type.as_deref(), Some("note"));
        assert_eq!(n.entity_id, Some(42));
        assert_eq!(n.payload["note_id"], 42);
        assert_eq!(n.link.as_deref(), Some("/notes/42"));

        let retargeted = n.for_recipient(9);
        assert_eq!(retargeted.recipient, 9);
        assert_eq!(retargeted.kind, "note.comment");
    }
}
