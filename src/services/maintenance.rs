use std::future::Future;
use std::time::Duration;

use crate::{error::Result, models::session::SessionStats, state::AppState};

/// The outcome of one maintenance pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Sessions expired during this pass.
    pub expired_sessions: usize,
    pub stats: SessionStats,
    /// Unexpired tokens left after sweeping.
    pub active_tokens: usize,
}

/// Expires idle sessions and samples the dashboard counters.
pub async fn run_once(state: &AppState) -> Result<MaintenanceReport> {
    let expired_sessions = state
        .sessions
        .cleanup_expired_sessions(state.config.session_max_age_hours)
        .await?;
    let stats = state.sessions.get_session_stats().await?;
    let active_tokens = state.tokens.get_active_tokens_count().await;

    Ok(MaintenanceReport {
        expired_sessions,
        stats,
        active_tokens,
    })
}

/// Runs `run_once` every `cleanup_interval_secs` until `shutdown` resolves.
///
/// A failed pass is logged and the loop carries on.
pub async fn run_until<F>(state: AppState, shutdown: F)
where
    F: Future<Output = ()>,
{
    let period = Duration::from_secs(state.config.cleanup_interval_secs);
    let mut ticker = tokio::time::interval(period);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!("🛑 Maintenance loop stopped");
                break;
            }
            _ = ticker.tick() => {
                tracing::info!("🧹 Running scheduled session cleanup...");
                match run_once(&state).await {
                    Ok(report) => {
                        tracing::info!(
                            expired = report.expired_sessions,
                            active_sessions = report.stats.active_sessions,
                            total_connections = report.stats.total_connections,
                            today_connections = report.stats.today_connections,
                            average_duration_ms = report.stats.average_duration,
                            active_tokens = report.active_tokens,
                            "✅ Cleanup job completed successfully"
                        );
                    }
                    Err(e) => {
                        tracing::error!("❌ Cleanup job failed: {}", e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Config;
    use crate::models::session::NewSession;
    use chrono::Utc;
    use std::sync::Arc;

    #[tokio::test]
    async fn run_once_expires_idle_sessions_and_counts_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            sessions_file: dir.path().join("sessions.json"),
            session_max_age_hours: 1,
            ..Config::default()
        };
        let clock = ManualClock::new(Utc::now());
        let state = AppState::with_clock(&config, Arc::new(clock.clone()));

        state.sessions.create_session(NewSession::new("alice")).await.unwrap();
        state.tokens.generate_token().await.unwrap();
        clock.advance(chrono::Duration::hours(2));

        let report = run_once(&state).await.unwrap();

        assert_eq!(report.expired_sessions, 1);
        assert_eq!(report.stats.active_sessions, 0);
        assert_eq!(report.stats.total_connections, 1);
        assert_eq!(report.active_tokens, 0);
    }

    #[tokio::test]
    async fn run_until_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            sessions_file: dir.path().join("sessions.json"),
            ..Config::default()
        };
        let state = AppState::new(&config);

        run_until(state, async {}).await;
    }
}
