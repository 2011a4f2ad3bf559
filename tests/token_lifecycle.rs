use std::sync::Arc;

use chrono::{Duration, Utc};
use presence_core::clock::ManualClock;
use presence_core::models::token::{InvalidReason, TokenKind};
use presence_core::services::tokens::TokenEngine;

// Shared test context
struct TestContext {
    clock: ManualClock,
    engine: TokenEngine,
}

impl TestContext {
    fn new() -> Self {
        let clock = ManualClock::new(Utc::now());
        let engine = TokenEngine::new(Arc::new(clock.clone()));
        Self { clock, engine }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generic_token_lifecycle() {
        let ctx = TestContext::new();
        let record = ctx.engine.generate_token().await.unwrap();

        assert!(!record.used);
        assert_eq!(record.kind, TokenKind::Generic);
        assert_eq!(record.expires - record.created, Duration::minutes(10));

        let first = ctx.engine.verify_token(&record.token).await;
        let second = ctx.engine.verify_token(&record.token).await;
        assert!(first.is_valid());
        assert!(second.is_valid());
        assert_eq!(second.data(), Some(&record));

        ctx.engine.mark_token_used(&record.token).await;
        assert_eq!(
            ctx.engine.verify_token(&record.token).await.reason(),
            Some(InvalidReason::AlreadyUsed)
        );
    }

    #[tokio::test]
    async fn generic_token_expires_after_ttl() {
        let ctx = TestContext::new();
        let record = ctx.engine.generate_token().await.unwrap();

        ctx.clock.set(record.created + Duration::minutes(10) + Duration::seconds(1));

        assert_eq!(
            ctx.engine.verify_token(&record.token).await.reason(),
            Some(InvalidReason::Expired)
        );
        assert_eq!(
            ctx.engine.verify_token(&record.token).await.reason(),
            Some(InvalidReason::NotFound)
        );
    }

    #[tokio::test]
    async fn premium_token_lasts_its_duration() {
        let ctx = TestContext::new();
        let record = ctx
            .engine
            .generate_premium_token("alice@s.whatsapp.net", 30)
            .await
            .unwrap();

        assert_eq!(record.expires, record.created + Duration::days(30));
        assert_eq!(
            record.kind,
            TokenKind::Premium {
                user_jid: "alice@s.whatsapp.net".to_string(),
                duration_days: 30,
            }
        );

        ctx.clock.set(record.created + Duration::days(29));
        assert!(ctx.engine.verify_token(&record.token).await.is_valid());

        ctx.clock.set(record.created + Duration::days(31));
        assert!(!ctx.engine.verify_token(&record.token).await.is_valid());
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let ctx = TestContext::new();

        let outcome = ctx.engine.verify_token("deadbeef").await;

        assert_eq!(outcome.reason(), Some(InvalidReason::NotFound));
        assert_eq!(outcome.data(), None);
    }

    #[tokio::test]
    async fn marking_unknown_token_is_a_no_op() {
        let ctx = TestContext::new();
        let record = ctx.engine.generate_token().await.unwrap();

        ctx.engine.mark_token_used("deadbeef").await;

        assert_eq!(ctx.engine.get_active_tokens_count().await, 1);
        assert!(ctx.engine.verify_token(&record.token).await.is_valid());
    }

    #[tokio::test]
    async fn active_count_includes_used_but_not_expired() {
        let ctx = TestContext::new();
        let generic = ctx.engine.generate_token().await.unwrap();
        ctx.engine.generate_premium_token("bob", 30).await.unwrap();

        ctx.engine.mark_token_used(&generic.token).await;
        assert_eq!(ctx.engine.get_active_tokens_count().await, 2);

        ctx.clock.advance(Duration::hours(1));
        assert_eq!(ctx.engine.get_active_tokens_count().await, 1);
    }

    #[tokio::test]
    async fn clones_share_one_table() {
        let ctx = TestContext::new();
        let other = ctx.engine.clone();

        let record = other.generate_token().await.unwrap();

        assert!(ctx.engine.verify_token(&record.token).await.is_valid());
    }
}
