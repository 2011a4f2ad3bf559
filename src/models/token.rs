use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// What a token authorizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TokenKind {
    /// A pairing token.
    Generic,
    /// An entitlement activation bound to one identity.
    #[serde(rename_all = "camelCase")]
    Premium {
        user_jid: String,
        /// The entitlement length in days.
        duration_days: u32,
    },
}

/// An issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenRecord {
    pub token: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    /// Set once the token has been consumed. Never cleared.
    pub used: bool,
    #[serde(flatten)]
    pub kind: TokenKind,
}

impl TokenRecord {
    /// Whether the token has passed its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires
    }

    /// Whether the token would still authorize an action at `now`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired(now)
    }
}

/// Why a token failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    NotFound,
    AlreadyUsed,
    Expired,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::NotFound => "not found",
            InvalidReason::AlreadyUsed => "already used",
            InvalidReason::Expired => "expired",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of verifying a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenVerification {
    Valid(TokenRecord),
    Invalid(InvalidReason),
}

impl TokenVerification {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenVerification::Valid(_))
    }

    /// The failure reason, if any.
    pub fn reason(&self) -> Option<InvalidReason> {
        match self {
            TokenVerification::Valid(_) => None,
            TokenVerification::Invalid(reason) => Some(*reason),
        }
    }

    /// The verified record, if any.
    pub fn data(&self) -> Option<&TokenRecord> {
        match self {
            TokenVerification::Valid(record) => Some(record),
            TokenVerification::Invalid(_) => None,
        }
    }
}
