//! Flash sale models: time-boxed discounted prices for single products.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a flash sale record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct FlashSale {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sale_price: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl FlashSale {
    /// Whether the sale applies at `now`. The window is `[starts_at, ends_at)`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.starts_at <= now && now < self.ends_at
    }
}

/// Flash sale joined with the product it discounts, as shown on the storefront.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct FlashSaleListing {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_title: String,
    pub game: String,
    pub original_price: i64,
    pub sale_price: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Request body for creating or replacing a flash sale (admin).
#[derive(Debug, Deserialize)]
pub struct FlashSaleRequest {
    pub product_id: Uuid,
    pub sale_price: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}
