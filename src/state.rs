use chrono::Duration;
use std::sync::Arc;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::repositories::session::SessionRepository;
use crate::services::sessions::SessionStore;
use crate::services::tokens::TokenEngine;

/// The application's state.
///
/// Built once and handed to every caller; there is no ambient global state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Config,
    /// The session lifecycle store.
    pub sessions: Arc<SessionStore>,
    /// The token table.
    pub tokens: TokenEngine,
}

impl AppState {
    /// Creates a new `AppState` on the system clock.
    pub fn new(config: &Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a new `AppState` reading time from `clock`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    /// * `clock` - The time source shared by both components.
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let repo = SessionRepository::new(config.sessions_file.clone());
        let sessions = Arc::new(SessionStore::new(repo, clock.clone()));
        tracing::info!("✅ Session store initialized at {}", config.sessions_file.display());

        let tokens = TokenEngine::with_ttl(clock, Duration::minutes(config.token_ttl_minutes));
        tracing::info!("✅ Token engine initialized ({} min TTL)", config.token_ttl_minutes);

        AppState {
            config: config.clone(),
            sessions,
            tokens,
        }
    }

    /// Issues a premium token with the configured default duration.
    pub async fn generate_default_premium_token(
        &self,
        user_jid: &str,
    ) -> crate::error::Result<crate::models::token::TokenRecord> {
        self.tokens
            .generate_premium_token(user_jid, self.config.premium_duration_days)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_premium_token_uses_configured_duration() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            sessions_file: dir.path().join("sessions.json"),
            premium_duration_days: 7,
            ..Config::default()
        };
        let state = AppState::new(&config);

        let record = state.generate_default_premium_token("alice").await.unwrap();

        assert_eq!(record.expires - record.created, Duration::days(7));
    }
}
