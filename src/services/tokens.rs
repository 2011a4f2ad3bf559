use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    clock::Clock,
    crypto::token,
    error::Result,
    models::token::{InvalidReason, TokenKind, TokenRecord, TokenVerification},
};

/// The default lifetime of a generic token.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 10;
/// The default entitlement length of a premium token.
pub const DEFAULT_PREMIUM_DURATION_DAYS: u32 = 30;

/// Issues and checks single-use tokens.
///
/// The table lives in process memory only; a restart invalidates every
/// outstanding token. Expired entries are swept as a side effect of
/// generation, verification and counting.
#[derive(Clone)]
pub struct TokenEngine {
    tokens: Arc<RwLock<HashMap<String, TokenRecord>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl TokenEngine {
    /// Creates a new `TokenEngine` with the default generic TTL.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(clock, Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES))
    }

    /// Creates a new `TokenEngine` whose generic tokens live for `ttl`.
    pub fn with_ttl(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            tokens: Arc::new(RwLock::new(HashMap::new())),
            clock,
            ttl,
        }
    }

    fn sweep(tokens: &mut HashMap<String, TokenRecord>, now: DateTime<Utc>) -> usize {
        let before = tokens.len();
        tokens.retain(|_, record| !record.is_expired(now));
        let removed = before - tokens.len();
        if removed > 0 {
            tracing::debug!("Swept {} expired tokens", removed);
        }
        removed
    }

    async fn issue(&self, token: String, lifetime: Duration, kind: TokenKind) -> TokenRecord {
        let now = self.clock.now();
        let record = TokenRecord {
            token: token.clone(),
            created: now,
            expires: now.checked_add_signed(lifetime).unwrap_or(DateTime::<Utc>::MAX_UTC),
            used: false,
            kind,
        };

        let mut tokens = self.tokens.write().await;
        Self::sweep(&mut tokens, now);
        tokens.insert(token, record.clone());
        record
    }

    /// Generates a generic token valid for the configured TTL.
    ///
    /// # Returns
    ///
    /// A `Result` containing the issued `TokenRecord`.
    pub async fn generate_token(&self) -> Result<TokenRecord> {
        let token = token::generate_generic_token()?;
        let record = self.issue(token, self.ttl, TokenKind::Generic).await;

        tracing::debug!("Generic token issued, expires at {}", record.expires);
        Ok(record)
    }

    /// Generates a premium token bound to `user_jid`.
    ///
    /// # Arguments
    ///
    /// * `user_jid` - The identity the entitlement is for.
    /// * `duration_days` - How long the token, and the entitlement, last.
    pub async fn generate_premium_token(
        &self,
        user_jid: &str,
        duration_days: u32,
    ) -> Result<TokenRecord> {
        let token = token::generate_premium_token()?;
        let kind = TokenKind::Premium {
            user_jid: user_jid.to_string(),
            duration_days,
        };
        let record = self
            .issue(token, Duration::days(i64::from(duration_days)), kind)
            .await;

        tracing::info!(
            "Premium token issued for {} ({} days)",
            user_jid,
            duration_days
        );
        Ok(record)
    }

    /// Checks a token without consuming it.
    pub async fn verify_token(&self, token: &str) -> TokenVerification {
        let now = self.clock.now();
        let mut tokens = self.tokens.write().await;

        let outcome = match tokens.get(token) {
            None => TokenVerification::Invalid(InvalidReason::NotFound),
            Some(record) if record.used => TokenVerification::Invalid(InvalidReason::AlreadyUsed),
            Some(record) if record.is_expired(now) => {
                TokenVerification::Invalid(InvalidReason::Expired)
            }
            Some(record) => TokenVerification::Valid(record.clone()),
        };

        if outcome.reason() == Some(InvalidReason::Expired) {
            tokens.remove(token);
        }
        Self::sweep(&mut tokens, now);

        if let TokenVerification::Invalid(reason) = outcome {
            tracing::debug!("Token rejected: {}", reason);
        }
        outcome
    }

    /// Consumes a token. Unknown tokens are ignored.
    pub async fn mark_token_used(&self, token: &str) {
        let mut tokens = self.tokens.write().await;
        match tokens.get_mut(token) {
            Some(record) => record.used = true,
            None => tracing::debug!("Ignoring consumption of unknown token"),
        }
    }

    /// Removes a token outright.
    ///
    /// # Returns
    ///
    /// `true` if the token was present.
    pub async fn revoke_token(&self, token: &str) -> bool {
        let mut tokens = self.tokens.write().await;
        tokens.remove(token).is_some()
    }

    /// Counts unexpired tokens, used or not.
    pub async fn get_active_tokens_count(&self) -> usize {
        let now = self.clock.now();
        let mut tokens = self.tokens.write().await;
        Self::sweep(&mut tokens, now);
        tokens.len()
    }
}
