//! Admin-panel sessions.
//!
//! The panel authenticates with an opaque session id carried in a cookie.
//! The `SQLite` store never persists the raw id: lookups go through a
//! SHA-256 blind index, so a leaked database dump cannot be replayed as a
//! cookie.

use crate::auth::AuthError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

/// An active admin session.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub admin_id: i64,
    pub username: String,
    pub role: String,
    pub expires_at: DateTime<Utc>,
}

impl AdminSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Computes the blind index for a session id (SHA-256, hex-encoded).
#[must_use]
pub fn blind_index(session_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    hex::encode(hasher.finalize())
}

/// Storage abstraction for admin sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Resolves a raw session id to the session, if one exists. Expiry is
    /// the caller's concern so that "expired" and "unknown" stay
    /// distinguishable in logs.
    async fn find(&self, session_id: &str) -> Result<Option<AdminSession>, AuthError>;

    async fn insert(&self, session_id: &str, session: AdminSession) -> Result<(), AuthError>;

    async fn delete(&self, session_id: &str) -> Result<(), AuthError>;

    /// Drops sessions past their expiry. Returns the number removed.
    async fn purge_expired(&self) -> Result<usize, AuthError>;
}

/// In-process session store for single-node deployments and tests.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, AdminSession>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn find(&self, session_id: &str) -> Result<Option<AdminSession>, AuthError> {
        Ok(self.sessions.get(session_id).map(|s| s.clone()))
    }

    async fn insert(&self, session_id: &str, session: AdminSession) -> Result<(), AuthError> {
        self.sessions.insert(session_id.to_string(), session);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), AuthError> {
        self.sessions.remove(session_id);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, AuthError> {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.expires_at > now);
        Ok(before - self.sessions.len())
    }
}

/// `SQLite`-backed session store.
///
/// Expects an `admin_sessions (session_index TEXT PRIMARY KEY, admin_id
/// INTEGER, username TEXT, role TEXT, expires_at INTEGER)` table; schema
/// management lives outside this crate.
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn find(&self, session_id: &str) -> Result<Option<AdminSession>, AuthError> {
        let row = sqlx::query(
            r"
            SELECT admin_id, username, role, expires_at
            FROM admin_sessions
            WHERE session_index = ?
            ",
        )
        .bind(blind_index(session_id))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let expires_at: i64 = row
                .try_get("expires_at")
                .map_err(|e| AuthError::DatabaseError(format!("column 'expires_at': {e}")))?;
            Ok(AdminSession {
                admin_id: row
                    .try_get("admin_id")
                    .map_err(|e| AuthError::DatabaseError(format!("column 'admin_id': {e}")))?,
                username: row
                    .try_get("username")
                    .map_err(|e| AuthError::DatabaseError(format!("column 'username': {e}")))?,
                role: row
                    .try_get("role")
                    .map_err(|e| AuthError::DatabaseError(format!("column 'role': {e}")))?,
                expires_at: DateTime::from_timestamp(expires_at, 0)
                    .ok_or_else(|| AuthError::DatabaseError("bad expires_at".to_string()))?,
            })
        })
        .transpose()
    }

    async fn insert(&self, session_id: &str, session: AdminSession) -> Result<(), AuthError> {
        sqlx::query(
            r"
            INSERT INTO admin_sessions (session_index, admin_id, username, role, expires_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(session_index) DO UPDATE SET
                admin_id = excluded.admin_id,
                username = excluded.username,
                role = excluded.role,
                expires_at = excluded.expires_at
            ",
        )
        .bind(blind_index(session_id))
        .bind(session.admin_id)
        .bind(&session.username)
        .bind(&session.role)
        .bind(session.expires_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM admin_sessions WHERE session_index = ?")
            .bind(blind_index(session_id))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, AuthError> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE expires_at < ?")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await?;

        Ok(usize::try_from(result.rows_affected()).unwrap_or(usize::MAX))
    }
}
