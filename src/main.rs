use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use presence_core::config::Config;
use presence_core::services::maintenance;
use presence_core::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config);

    // Fail fast on an unreadable document instead of on the first tick.
    let stats = state
        .sessions
        .get_session_stats()
        .await
        .with_context(|| format!("Failed to read {}", config.sessions_file.display()))?;
    tracing::info!(
        "✅ Loaded {} total connections ({} active)",
        stats.total_connections,
        stats.active_sessions
    );

    tracing::info!(
        "✅ Background cleanup job started (runs every {}s)",
        config.cleanup_interval_secs
    );

    maintenance::run_until(state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await;

    Ok(())
}
