//! # Twix API Server
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p twix-api
//! ```

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twix_api::{
    app::{build_notifier, build_router, AppState},
    config::Config,
};
use twix_shared::{
    assignment::AssignmentEngine,
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "twix_api=debug,twix_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Twix API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Failed to load configuration")?;

    let db = create_pool(DatabaseConfig {
        max_connections: config.database.max_connections,
        ..DatabaseConfig::from_url(config.database.url.clone())
    })
    .await
    .context("Failed to connect to database")?;

    run_migrations(&db)
        .await
        .context("Failed to run migrations")?;

    let notifier = build_notifier(&db, &config)?;
    tracing::info!(notifier = notifier.name(), "Notifier ready");

    let bind_address = config.bind_address();
    let state = AppState::new(db.clone(), config, AssignmentEngine::new(notifier));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received, exiting...");
        })
        .await?;

    close_pool(db).await;

    Ok(())
}
