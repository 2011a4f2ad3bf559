use std::env;
use std::path::PathBuf;
use anyhow::{Context, Result};

use crate::services::tokens::{DEFAULT_PREMIUM_DURATION_DAYS, DEFAULT_TOKEN_TTL_MINUTES};

/// The application's configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// The location of the durable session document.
    pub sessions_file: PathBuf,
    /// How long an active session may stay idle before it is expired, in hours.
    pub session_max_age_hours: u64,
    /// How often the maintenance loop runs, in seconds.
    pub cleanup_interval_secs: u64,
    /// The lifetime of a generic token in minutes.
    pub token_ttl_minutes: i64,
    /// The default length of a premium entitlement in days.
    pub premium_duration_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sessions_file: PathBuf::from("data/sessions.json"),
            session_max_age_hours: 24,
            cleanup_interval_secs: 3600,
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            premium_duration_days: DEFAULT_PREMIUM_DURATION_DAYS,
        }
    }
}

/// Reads `key`, falling back to `default` when it is unset.
fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("Invalid {}", key)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let token_ttl_minutes: i64 = var_or("TOKEN_TTL_MINUTES", defaults.token_ttl_minutes)?;
        if token_ttl_minutes <= 0 || chrono::Duration::try_minutes(token_ttl_minutes).is_none() {
            anyhow::bail!("TOKEN_TTL_MINUTES must be a positive number of minutes");
        }

        let cleanup_interval_secs: u64 =
            var_or("CLEANUP_INTERVAL_SECS", defaults.cleanup_interval_secs)?;
        if cleanup_interval_secs == 0 {
            anyhow::bail!("CLEANUP_INTERVAL_SECS must be positive");
        }

        Ok(Self {
            sessions_file: env::var("SESSIONS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.sessions_file),
            session_max_age_hours: var_or("SESSION_MAX_AGE_HOURS", defaults.session_max_age_hours)?,
            cleanup_interval_secs,
            token_ttl_minutes,
            premium_duration_days: var_or("PREMIUM_DURATION_DAYS", defaults.premium_duration_days)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variable_falls_back_to_default() {
        let value: u64 = var_or("PRESENCE_CORE_UNSET_FOR_TEST", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn defaults_match_token_engine() {
        let config = Config::default();
        assert_eq!(config.token_ttl_minutes, 10);
        assert_eq!(config.premium_duration_days, 30);
        assert_eq!(config.session_max_age_hours, 24);
    }
}
