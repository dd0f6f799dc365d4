//! Counter storage backends.
//!
//! Both backends serialize the read-modify-write per key so concurrent hits
//! cannot double-count past the threshold: the memory store mutates under a
//! `DashMap` entry lock, the `SQLite` store runs the read and write inside
//! one `BEGIN IMMEDIATE` transaction.

use super::{advance, Counter, RateLimitError, RateLimitPolicy};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::{Row, SqlitePool};

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Applies one hit to `key` atomically and returns the post-hit counter.
    async fn apply_hit(
        &self,
        key: &str,
        now: DateTime<Utc>,
        policy: &RateLimitPolicy,
    ) -> Result<Counter, RateLimitError>;

    /// Reads the current counter without modifying it.
    async fn peek(&self, key: &str) -> Result<Option<Counter>, RateLimitError>;

    /// Drops counters that are neither blocked nor inside a live window.
    /// Returns the number of removed entries.
    async fn purge_stale(
        &self,
        now: DateTime<Utc>,
        policy: &RateLimitPolicy,
    ) -> Result<usize, RateLimitError>;
}

/// In-process counter store for single-node deployments and tests.
#[derive(Default)]
pub struct MemoryCounterStore {
    counters: DashMap<String, Counter>,
}

impl MemoryCounterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn apply_hit(
        &self,
        key: &str,
        now: DateTime<Utc>,
        policy: &RateLimitPolicy,
    ) -> Result<Counter, RateLimitError> {
        // The entry guard holds the shard lock for the whole read-modify-write.
        let counter = match self.counters.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                let next = advance(Some(*occupied.get()), now, policy);
                *occupied.get_mut() = next;
                next
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let next = advance(None, now, policy);
                vacant.insert(next);
                next
            }
        };

        Ok(counter)
    }

    async fn peek(&self, key: &str) -> Result<Option<Counter>, RateLimitError> {
        Ok(self.counters.get(key).map(|entry| *entry.value()))
    }

    async fn purge_stale(
        &self,
        now: DateTime<Utc>,
        policy: &RateLimitPolicy,
    ) -> Result<usize, RateLimitError> {
        let window = chrono::Duration::seconds(policy.window_seconds);
        let before = self.counters.len();
        self.counters.retain(|_, counter| {
            counter.blocked_until.is_some_and(|until| until > now) ||
                now < counter.window_start + window
        });
        Ok(before - self.counters.len())
    }
}

/// `SQLite`-backed counter store shared across worker processes.
///
/// Expects a `rate_limit_counters (key TEXT PRIMARY KEY, hits INTEGER,
/// window_start INTEGER, blocked_until INTEGER)` table with unix-second
/// timestamps; schema management lives outside this crate.
pub struct SqliteCounterStore {
    pool: SqlitePool,
}

impl SqliteCounterStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_counter(row: &sqlx::sqlite::SqliteRow) -> Result<Counter, RateLimitError> {
        let hits: i64 = row
            .try_get("hits")
            .map_err(|e| RateLimitError::Storage(format!("column 'hits': {e}")))?;
        let window_start: i64 = row
            .try_get("window_start")
            .map_err(|e| RateLimitError::Storage(format!("column 'window_start': {e}")))?;
        let blocked_until: Option<i64> = row
            .try_get("blocked_until")
            .map_err(|e| RateLimitError::Storage(format!("column 'blocked_until': {e}")))?;

        Ok(Counter {
            hits: u32::try_from(hits)
                .map_err(|_| RateLimitError::Storage(format!("hit count {hits} out of range")))?,
            window_start: timestamp(window_start)?,
            blocked_until: blocked_until.map(timestamp).transpose()?,
        })
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, RateLimitError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| RateLimitError::Storage(format!("timestamp {secs} out of range")))
}

#[async_trait]
impl CounterStore for SqliteCounterStore {
    async fn apply_hit(
        &self,
        key: &str,
        now: DateTime<Utc>,
        policy: &RateLimitPolicy,
    ) -> Result<Counter, RateLimitError> {
        let mut conn = self.pool.acquire().await?;

        // IMMEDIATE takes the write lock up front, serializing concurrent
        // hits on the same key across processes.
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result: Result<Counter, RateLimitError> = async {
            let row = sqlx::query(
                "SELECT hits, window_start, blocked_until FROM rate_limit_counters WHERE key = ?",
            )
            .bind(key)
            .fetch_optional(&mut *conn)
            .await?;

            let previous = row.as_ref().map(Self::row_to_counter).transpose()?;
            let next = advance(previous, now, policy);

            sqlx::query(
                r"
                INSERT INTO rate_limit_counters (key, hits, window_start, blocked_until)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                    hits = excluded.hits,
                    window_start = excluded.window_start,
                    blocked_until = excluded.blocked_until
                ",
            )
            .bind(key)
            .bind(i64::from(next.hits))
            .bind(next.window_start.timestamp())
            .bind(next.blocked_until.map(|t| t.timestamp()))
            .execute(&mut *conn)
            .await?;

            Ok(next)
        }
        .await;

        match &result {
            Ok(_) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
            }
            Err(_) => {
                // Best effort; the connection is dropped either way.
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            }
        }

        result
    }

    async fn peek(&self, key: &str) -> Result<Option<Counter>, RateLimitError> {
        let row = sqlx::query(
            "SELECT hits, window_start, blocked_until FROM rate_limit_counters WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_counter).transpose()
    }

    async fn purge_stale(
        &self,
        now: DateTime<Utc>,
        policy: &RateLimitPolicy,
    ) -> Result<usize, RateLimitError> {
        let result = sqlx::query(
            r"
            DELETE FROM rate_limit_counters
            WHERE (blocked_until IS NULL OR blocked_until <= ?)
              AND window_start + ? <= ?
            ",
        )
        .bind(now.timestamp())
        .bind(policy.window_seconds)
        .bind(now.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(usize::try_from(result.rows_affected()).unwrap_or(usize::MAX))
    }
}
