//! Token blacklist stores.
//!
//! A blacklist entry is `{jti, expires_at}`. Entries past their recorded
//! expiry can be purged at any time: `verify` rejects expired tokens before
//! it ever consults the blacklist, so an un-purged stale entry has no
//! observable effect.

use super::TokenError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::SqlitePool;

/// Storage abstraction for revoked token ids.
#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    /// Records a revoked `jti` together with the token's natural expiry.
    /// Inserting the same `jti` twice is not an error.
    async fn insert(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), TokenError>;

    async fn contains(&self, jti: &str) -> Result<bool, TokenError>;

    /// Garbage-collects entries whose recorded expiry has passed.
    /// Returns the number of removed entries.
    async fn purge_expired(&self) -> Result<usize, TokenError>;
}

/// In-process blacklist for single-node deployments and tests.
#[derive(Default)]
pub struct MemoryTokenBlacklist {
    entries: DashMap<String, DateTime<Utc>>,
}

impl MemoryTokenBlacklist {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TokenBlacklist for MemoryTokenBlacklist {
    async fn insert(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), TokenError> {
        self.entries.insert(jti.to_string(), expires_at);
        Ok(())
    }

    async fn contains(&self, jti: &str) -> Result<bool, TokenError> {
        Ok(self.entries.contains_key(jti))
    }

    async fn purge_expired(&self) -> Result<usize, TokenError> {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        Ok(before - self.entries.len())
    }
}

/// `SQLite`-backed blacklist shared across worker processes.
///
/// Expects a `token_blacklist (jti TEXT PRIMARY KEY, expires_at INTEGER)`
/// table; schema management lives outside this crate.
pub struct SqliteTokenBlacklist {
    pool: SqlitePool,
}

impl SqliteTokenBlacklist {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenBlacklist for SqliteTokenBlacklist {
    async fn insert(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), TokenError> {
        sqlx::query(
            r"
            INSERT INTO token_blacklist (jti, expires_at)
            VALUES (?, ?)
            ON CONFLICT(jti) DO UPDATE SET expires_at = excluded.expires_at
            ",
        )
        .bind(jti)
        .bind(expires_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn contains(&self, jti: &str) -> Result<bool, TokenError> {
        let row = sqlx::query("SELECT 1 FROM token_blacklist WHERE jti = ?")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    async fn purge_expired(&self) -> Result<usize, TokenError> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at < ?")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await?;

        Ok(usize::try_from(result.rows_affected()).unwrap_or(usize::MAX))
    }
}
