use super::{user::AdminUser, AuthError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{Row, SqlitePool};

/// Repository trait for admin-account database operations.
///
/// An abstraction layer enabling testability (mock implementations) and
/// backend flexibility; the shipped backend is `SQLite`.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>, AuthError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<AdminUser>, AuthError>;

    /// Creates an account and returns its id. The password hash must already
    /// be in PHC format; this layer never sees plaintext.
    async fn create(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<i64, AuthError>;

    async fn set_password(&self, username: &str, password_hash: &str) -> Result<(), AuthError>;

    async fn set_active(&self, username: &str, active: bool) -> Result<(), AuthError>;

    async fn set_totp_secret(
        &self,
        username: &str,
        secret_hex: Option<&str>,
    ) -> Result<(), AuthError>;

    async fn record_login(&self, id: i64) -> Result<(), AuthError>;

    async fn list_all(&self) -> Result<Vec<AdminUser>, AuthError>;
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Extracts a non-nullable field from a database row.
    fn get_required<'r, T>(row: &'r sqlx::sqlite::SqliteRow, column: &str) -> Result<T, AuthError>
    where
        T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
    {
        row.try_get::<T, _>(column)
            .map_err(|e| AuthError::DatabaseError(format!("column '{column}': {e}")))
    }

    fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<AdminUser, AuthError> {
        Ok(AdminUser {
            id: Self::get_required(row, "id")?,
            username: Self::get_required(row, "username")?,
            password_hash: Self::get_required(row, "password_hash")?,
            role: Self::get_required(row, "role")?,
            totp_secret: row.get::<Option<String>, _>("totp_secret"),
            is_active: Self::get_required(row, "is_active")?,
            created_at: DateTime::from_naive_utc_and_offset(
                Self::get_required(row, "created_at")?,
                Utc,
            ),
            updated_at: DateTime::from_naive_utc_and_offset(
                Self::get_required(row, "updated_at")?,
                Utc,
            ),
            last_login_at: row
                .get::<Option<NaiveDateTime>, _>("last_login_at")
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
        })
    }
}

const USER_COLUMNS: &str = "id, username, password_hash, role, totp_secret, is_active, \
                            created_at, updated_at, last_login_at";

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>, AuthError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM admin_users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::row_to_user(&row)).transpose()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<AdminUser>, AuthError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM admin_users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Self::row_to_user(&row)).transpose()
    }

    async fn create(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<i64, AuthError> {
        let result = sqlx::query(
            r"
            INSERT INTO admin_users (username, password_hash, role, is_active,
                                     created_at, updated_at)
            VALUES (?, ?, ?, 1, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            ",
        )
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn set_password(&self, username: &str, password_hash: &str) -> Result<(), AuthError> {
        sqlx::query(
            r"
            UPDATE admin_users
            SET password_hash = ?, updated_at = CURRENT_TIMESTAMP
            WHERE username = ?
            ",
        )
        .bind(password_hash)
        .bind(username)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_active(&self, username: &str, active: bool) -> Result<(), AuthError> {
        sqlx::query(
            r"
            UPDATE admin_users
            SET is_active = ?, updated_at = CURRENT_TIMESTAMP
            WHERE username = ?
            ",
        )
        .bind(active)
        .bind(username)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_totp_secret(
        &self,
        username: &str,
        secret_hex: Option<&str>,
    ) -> Result<(), AuthError> {
        sqlx::query(
            r"
            UPDATE admin_users
            SET totp_secret = ?, updated_at = CURRENT_TIMESTAMP
            WHERE username = ?
            ",
        )
        .bind(secret_hex)
        .bind(username)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_login(&self, id: i64) -> Result<(), AuthError> {
        sqlx::query("UPDATE admin_users SET last_login_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<AdminUser>, AuthError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM admin_users ORDER BY username"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_user).collect()
    }
}
