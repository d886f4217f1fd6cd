//! # Twix Worker
//!
//! Sends task reminders once their time has come.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p twix-worker
//! ```

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twix_shared::db::pool::{close_pool, create_pool, DatabaseConfig};
use twix_shared::notify::{LogNotifier, Notifier, PushNotifier};
use twix_worker::config::WorkerConfig;
use twix_worker::orchestrator::ReminderDispatcher;
use twix_worker::queue::ReminderQueue;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "twix_worker=debug,twix_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Twix Worker v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = WorkerConfig::from_env().context("Failed to load configuration")?;

    let db = create_pool(DatabaseConfig {
        max_connections: config.max_connections,
        ..DatabaseConfig::from_url(config.database_url.clone())
    })
    .await
    .context("Failed to connect to database")?;

    let notifier: Arc<dyn Notifier> = match config.push.clone() {
        Some(push) => Arc::new(PushNotifier::new(db.clone(), push)?),
        None => {
            tracing::warn!("PUSH_GATEWAY_URL not set, reminders will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let dispatcher = ReminderDispatcher::new(
        ReminderQueue::new(db.clone(), config.batch_size),
        notifier,
        config.poll_interval,
    );

    let shutdown = dispatcher.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Shutdown signal received, exiting...");
        shutdown.cancel();
    });

    dispatcher.run().await?;
    close_pool(db).await;

    Ok(())
}
