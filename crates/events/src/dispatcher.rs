//! Channel queue dispatcher.
//!
//! [`QueueDispatcher`] runs as a background task, periodically claiming due
//! `pending` channel-queue items and handing each to the matching delivery
//! channel. Failures are retried with linear backoff until the attempt
//! budget is exhausted, then the item is marked `failed`.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use relay_core::channels::{CHANNEL_EMAIL, CHANNEL_PUSH};
use relay_db::models::queue::QueueItem;
use relay_db::repositories::{DeviceRepo, NotificationRepo, QueueRepo, UserRepo};
use relay_db::DbPool;

use crate::delivery::{EmailDelivery, PushDelivery};

/// How often the dispatcher polls for due items.
const DISPATCH_INTERVAL: Duration = Duration::from_secs(15);

/// How many items one poll claims.
const DISPATCH_BATCH_SIZE: i64 = 50;

/// Attempts before an item is abandoned as `failed`.
const MAX_ATTEMPTS: i32 = 5;

/// Linear backoff step between retries, in seconds.
const RETRY_STEP_SECS: i64 = 30;

/// Delay before the next retry of an item that has already used `attempts`.
fn next_retry_delay(attempts: i32) -> chrono::Duration {
    chrono::Duration::seconds(RETRY_STEP_SECS * (i64::from(attempts) + 1))
}

// ---------------------------------------------------------------------------
// QueueDispatcher
// ---------------------------------------------------------------------------

/// Background service draining the secondary-channel queue.
///
/// Channels are optional: a `None` delivery means the channel is not
/// configured and its items fail immediately with a descriptive error
/// instead of sitting pending forever.
pub struct QueueDispatcher {
    pool: DbPool,
    email: Option<EmailDelivery>,
    push: Option<PushDelivery>,
}

impl QueueDispatcher {
    /// Create a new dispatcher with the given database pool and channels.
    pub fn new(pool: DbPool, email: Option<EmailDelivery>, push: Option<PushDelivery>) -> Self {
        Self { pool, email, push }
    }

    /// Run the dispatch loop.
    ///
    /// Polls every [`DISPATCH_INTERVAL`] for due items. The loop exits
    /// gracefully when the provided [`CancellationToken`] is cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(DISPATCH_INTERVAL);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Queue dispatcher cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.drain_due().await {
                        tracing::error!(error = %e, "Failed to drain channel queue");
                    }
                }
            }
        }
    }

    /// Claim due items and process each one.
    async fn drain_due(&self) -> Result<(), sqlx::Error> {
        let items = QueueRepo::claim_due(&self.pool, DISPATCH_BATCH_SIZE).await?;

        for item in &items {
            if let Err(e) = self.process_item(item).await {
                tracing::error!(queue_item_id = item.id, error = %e, "Queue item processing failed");
            }
        }

        if !items.is_empty() {
            tracing::info!(count = items.len(), "Dispatched channel queue batch");
        }

        Ok(())
    }

    /// Deliver one queue item and record the outcome.
    async fn process_item(&self, item: &QueueItem) -> Result<(), sqlx::Error> {
        let Some(notification) =
            NotificationRepo::find_by_id(&self.pool, item.notification_id).await?
        else {
            // The FK should make this impossible; resolve the item anyway.
            QueueRepo::mark_failed(&self.pool, item.id, "notification row missing").await?;
            return Ok(());
        };

        let outcome = match item.channel.as_str() {
            CHANNEL_EMAIL => self.deliver_email(&notification).await,
            CHANNEL_PUSH => self.deliver_push(&notification).await,
            other => Err(format!("unknown channel: {other}")),
        };

        match outcome {
            Ok(()) => QueueRepo::mark_sent(&self.pool, item.id).await,
            Err(reason) if item.attempts + 1 >= MAX_ATTEMPTS => {
                tracing::warn!(
                    queue_item_id = item.id,
                    channel = %item.channel,
                    reason = %reason,
                    "Queue item exhausted its attempts"
                );
                QueueRepo::mark_failed(&self.pool, item.id, &reason).await
            }
            Err(reason) => {
                let next = Utc::now() + next_retry_delay(item.attempts);
                QueueRepo::reschedule(&self.pool, item.id, &reason, next).await
            }
        }
    }

    async fn deliver_email(
        &self,
        notification: &relay_db::models::notification::Notification,
    ) -> Result<(), String> {
        let Some(email) = &self.email else {
            return Err("email channel not configured".to_string());
        };

        let user = UserRepo::find_by_id(&self.pool, notification.user_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "recipient user missing".to_string())?;

        email
            .deliver(&user.email, notification)
            .await
            .map_err(|e| e.to_string())
    }

    async fn deliver_push(
        &self,
        notification: &relay_db::models::notification::Notification,
    ) -> Result<(), String> {
        let Some(push) = &self.push else {
            return Err("push channel not configured".to_string());
        };

        let devices = DeviceRepo::list_for_user(&self.pool, notification.user_id)
            .await
            .map_err(|e| e.to_string())?;

        if devices.is_empty() {
            // No registered browser; nothing to do, count as delivered.
            return Ok(());
        }

        let mut last_error = None;
        for device in &devices {
            if let Err(e) = push.deliver(device, notification).await {
                last_error = Some(e.to_string());
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_grows_linearly() {
        assert_eq!(next_retry_delay(0), chrono::Duration::seconds(30));
        assert_eq!(next_retry_delay(1), chrono::Duration::seconds(60));
        assert_eq!(next_retry_delay(4), chrono::Duration::seconds(150));
    }
}
