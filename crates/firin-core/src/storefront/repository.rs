use super::models::{ContactMessage, Order, OrderStatus, Product};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Order>, StoreError>;

    async fn list_recent(&self, limit: i64) -> Result<Vec<Order>, StoreError>;

    /// Updates an order's status. Returns `false` when no such order exists.
    async fn update_status(&self, id: i64, status: OrderStatus) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Product>, StoreError>;

    async fn list_active(&self) -> Result<Vec<Product>, StoreError>;

    async fn list_featured(&self) -> Result<Vec<Product>, StoreError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persists a contact message and returns its id.
    async fn create(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        message: &str,
    ) -> Result<i64, StoreError>;

    async fn list_recent(&self, limit: i64) -> Result<Vec<ContactMessage>, StoreError>;
}

fn required<'r, T>(row: &'r sqlx::sqlite::SqliteRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get::<T, _>(column)
        .map_err(|e| StoreError::CorruptRow(format!("column '{column}': {e}")))
}

fn utc(naive: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(naive, Utc)
}

pub struct SqliteOrderRepository {
    pool: SqlitePool,
}

impl SqliteOrderRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_order(row: &sqlx::sqlite::SqliteRow) -> Result<Order, StoreError> {
        let status: String = required(row, "status")?;
        Ok(Order {
            id: required(row, "id")?,
            customer_name: required(row, "customer_name")?,
            customer_phone: required(row, "customer_phone")?,
            total_kurus: required(row, "total_kurus")?,
            status: OrderStatus::parse(&status)
                .ok_or_else(|| StoreError::CorruptRow(format!("unknown status '{status}'")))?,
            note: row.get::<Option<String>, _>("note"),
            created_at: utc(required(row, "created_at")?),
            updated_at: utc(required(row, "updated_at")?),
        })
    }
}

const ORDER_COLUMNS: &str =
    "id, customer_name, customer_phone, total_kurus, status, note, created_at, updated_at";

#[async_trait]
impl OrderRepository for SqliteOrderRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Self::row_to_order(&row)).transpose()
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_order).collect()
    }

    async fn update_status(&self, id: i64, status: OrderStatus) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE orders SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct SqliteProductRepository {
    pool: SqlitePool,
}

impl SqliteProductRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, StoreError> {
        Ok(Product {
            id: required(row, "id")?,
            name: required(row, "name")?,
            slug: required(row, "slug")?,
            category: required(row, "category")?,
            price_kurus: required(row, "price_kurus")?,
            description: row.get::<Option<String>, _>("description"),
            is_featured: required(row, "is_featured")?,
            is_active: required(row, "is_active")?,
        })
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, slug, category, price_kurus, description, is_featured, is_active";

#[async_trait]
impl ProductRepository for SqliteProductRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ? AND is_active = 1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::row_to_product(&row)).transpose()
    }

    async fn list_active(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_product).collect()
    }

    async fn list_featured(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE is_active = 1 AND is_featured = 1 ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_product).collect()
    }
}

pub struct SqliteMessageRepository {
    pool: SqlitePool,
}

impl SqliteMessageRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for SqliteMessageRepository {
    async fn create(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        message: &str,
    ) -> Result<i64, StoreError> {
        let result = sqlx::query(
            r"
            INSERT INTO contact_messages (name, email, phone, message, created_at)
            VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
            ",
        )
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<ContactMessage>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, email, phone, message, created_at
            FROM contact_messages ORDER BY created_at DESC LIMIT ?
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ContactMessage {
                    id: required(row, "id")?,
                    name: required(row, "name")?,
                    email: required(row, "email")?,
                    phone: row.get::<Option<String>, _>("phone"),
                    message: required(row, "message")?,
                    created_at: utc(required(row, "created_at")?),
                })
            })
            .collect()
    }
}
