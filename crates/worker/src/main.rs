//! Secondary-channel dispatch worker.
//!
//! Runs the [`QueueDispatcher`] against the shared database: claims due
//! channel-queue items and delivers them over email/push. Kept as its own
//! binary so slow SMTP round-trips never share a process with the
//! request-serving API.

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relay_events::delivery::{EmailConfig, EmailDelivery, PushConfig, PushDelivery};
use relay_events::QueueDispatcher;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_worker=debug,relay_events=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = relay_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    let email = EmailConfig::from_env().map(EmailDelivery::new);
    if email.is_none() {
        tracing::warn!("SMTP_HOST not set, email channel disabled");
    }

    let push = PushConfig::from_env().map(PushDelivery::new);
    if push.is_none() {
        tracing::warn!("PUSH_GATEWAY_URL not set, push channel disabled");
    }

    let dispatcher = QueueDispatcher::new(pool, email, push);

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received SIGINT (Ctrl-C), stopping dispatcher");
            cancel_on_signal.cancel();
        }
    });

    tracing::info!("Queue dispatcher starting");
    dispatcher.run(cancel).await;
    tracing::info!("Queue dispatcher stopped");
}
