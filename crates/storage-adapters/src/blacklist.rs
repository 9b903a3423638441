//! # Token blacklist
//!
//! Revoked token ids (`jti`). An entry only has to outlive the token it
//! revokes, so every entry carries the token expiry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use domains::ports::TokenBlacklist;
use domains::DomainResult;

/// Shared in-process set. Expired entries are pruned lazily on writes and
/// when looked up.
#[derive(Default)]
pub struct InMemoryTokenBlacklist {
    entries: DashMap<String, DateTime<Utc>>,
}

impl InMemoryTokenBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn prune(&self, now: DateTime<Utc>) {
        self.entries.retain(|_, expires_at| *expires_at > now);
    }
}

#[async_trait]
impl TokenBlacklist for InMemoryTokenBlacklist {
    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> DomainResult<()> {
        let now = Utc::now();
        self.prune(now);
        if expires_at > now {
            self.entries.insert(jti.to_string(), expires_at);
        }
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> DomainResult<bool> {
        let now = Utc::now();
        let Some(expires_at) = self.entries.get(jti).map(|e| *e) else {
            return Ok(false);
        };
        if expires_at <= now {
            self.entries.remove(jti);
            return Ok(false);
        }
        Ok(true)
    }
}

#[cfg(feature = "redis")]
pub use redis_blacklist::RedisTokenBlacklist;

#[cfg(feature = "redis")]
mod redis_blacklist {
    use super::*;
    use deadpool_redis::{redis, Config, Pool, Runtime};
    use domains::DomainError;

    const KEY_PREFIX: &str = "lunchbox:revoked:";

    /// Keys expire with the token, so Redis does the pruning.
    pub struct RedisTokenBlacklist {
        pool: Pool,
    }

    impl RedisTokenBlacklist {
        pub fn connect(url: &str) -> DomainResult<Self> {
            let pool = Config::from_url(url)
                .create_pool(Some(Runtime::Tokio1))
                .map_err(DomainError::internal)?;
            Ok(Self { pool })
        }

        async fn conn(&self) -> DomainResult<deadpool_redis::Connection> {
            self.pool.get().await.map_err(DomainError::internal)
        }
    }

    #[async_trait]
    impl TokenBlacklist for RedisTokenBlacklist {
        async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> DomainResult<()> {
            let ttl = (expires_at - Utc::now()).num_seconds();
            if ttl <= 0 {
                return Ok(());
            }
            let mut conn = self.conn().await?;
            redis::cmd("SET")
                .arg(format!("{KEY_PREFIX}{jti}"))
                .arg(1)
                .arg("EX")
                .arg(ttl)
                .query_async::<()>(&mut conn)
                .await
                .map_err(DomainError::internal)
        }

        async fn is_revoked(&self, jti: &str) -> DomainResult<bool> {
            let mut conn = self.conn().await?;
            redis::cmd("EXISTS")
                .arg(format!("{KEY_PREFIX}{jti}"))
                .query_async::<bool>(&mut conn)
                .await
                .map_err(DomainError::internal)
        }
    }
}
