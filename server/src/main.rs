use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use sanjapass_server::clock::SystemClock;
use sanjapass_server::config::Config;
use sanjapass_server::crypto::OsSecureRandom;
use sanjapass_server::routes::create_routes;
use sanjapass_server::services::{spawn_expiry_sweeper, LogNotifier};
use sanjapass_server::state::AppState;
use sanjapass_server::store::memory::MemoryStore;
use sanjapass_server::store::postgres::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sanjapass_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    let clock = Arc::new(SystemClock);
    let rng = Arc::new(OsSecureRandom);
    let notifier = Arc::new(LogNotifier);
    if config.production {
        tracing::warn!(
            "No credential mailer configured: staff temporary passwords are only logged at debug level"
        );
    }

    let state = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.db_max_connections)
                .await
                .context("failed to connect to database")?;
            tracing::info!("Successfully connected to database");
            store.migrate().await.context("failed to run migrations")?;
            tracing::info!("Migrations run successfully");
            AppState::new(Arc::new(store), &config, clock, rng, notifier)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            AppState::new(Arc::new(MemoryStore::new()), &config, clock, rng, notifier)
        }
    };

    let sweeper = spawn_expiry_sweeper(state.ledger.clone(), config.sweep_interval);
    let app = create_routes(state, &config);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("🚀 Server running at http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    sweeper.abort();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
