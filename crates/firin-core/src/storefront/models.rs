use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order lifecycle states. The wire values are the Turkish storefront terms;
/// the API accepts exactly these via the `in:` validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Beklemede,
    Hazirlaniyor,
    Yolda,
    TeslimEdildi,
    Iptal,
}

impl OrderStatus {
    pub const ALL: [Self; 5] = [
        Self::Beklemede,
        Self::Hazirlaniyor,
        Self::Yolda,
        Self::TeslimEdildi,
        Self::Iptal,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beklemede => "beklemede",
            Self::Hazirlaniyor => "hazirlaniyor",
            Self::Yolda => "yolda",
            Self::TeslimEdildi => "teslim_edildi",
            Self::Iptal => "iptal",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// The accepted wire values in declaration order; the source for the
    /// `durum` validation rule and its error message.
    #[must_use]
    pub fn wire_values() -> Vec<String> {
        Self::ALL.iter().map(|s| s.as_str().to_string()).collect()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A customer order as the back office sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub customer_name: String,
    pub customer_phone: String,
    /// Total in kuruş to avoid floating-point money.
    pub total_kurus: i64,
    pub status: OrderStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub category: String,
    /// Price in kuruş.
    pub price_kurus: i64,
    pub description: Option<String>,
    pub is_featured: bool,
    pub is_active: bool,
}

/// A message left through the contact form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
