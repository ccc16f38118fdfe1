//! Product (game account / game service listing) models.
//!
//! Amounts are integer rupiah. IDR has no minor unit in practice, so `i64`
//! whole rupiah plays the role cents play elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "product_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    /// A game account sold or rented as-is
    Account,
    /// A service performed on the buyer's account (boosting, top-up, ...)
    Service,
}

/// Represents a product record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub game: String,
    pub product_type: ProductType,

    /// Purchase price in rupiah
    pub price: i64,

    /// Hourly rental price. `None` means the product cannot be rented.
    pub rental_price_per_hour: Option<i64>,

    pub stock: i32,

    /// JSON array of image URLs
    pub images: serde_json::Value,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query string for `GET /api/products`.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub game: Option<String>,
    pub product_type: Option<ProductType>,

    /// Case-insensitive title search
    pub q: Option<String>,

    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ProductQuery {
    pub const MAX_PER_PAGE: i64 = 100;
    pub const DEFAULT_PER_PAGE: i64 = 20;
    /// Keeps `(page - 1) * per_page` inside `i64`.
    pub const MAX_PAGE: i64 = i64::MAX / Self::MAX_PER_PAGE;

    /// Resolve `(limit, offset)` from the page parameters.
    ///
    /// Pages start at 1; out of range values are clamped.
    pub fn limit_offset(&self) -> (i64, i64) {
        let per_page = self
            .per_page
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .clamp(1, Self::MAX_PER_PAGE);
        let page = self.page.unwrap_or(1).clamp(1, Self::MAX_PAGE);
        (per_page, (page - 1) * per_page)
    }
}

/// Request body for creating or replacing a product (admin).
///
/// # JSON Example
///
/// ```json
/// {
///   "title": "Mythic account, 300 skins",
///   "description": "Full access, email changeable",
///   "game": "Mobile Legends",
///   "product_type": "account",
///   "price": 1500000,
///   "rental_price_per_hour": 15000,
///   "stock": 1,
///   "images": ["https://cdn.example.com/ml/1.jpg"]
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub game: String,
    pub product_type: ProductType,
    pub price: i64,
    pub rental_price_per_hour: Option<i64>,
    #[serde(default = "default_stock")]
    pub stock: i32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_stock() -> i32 {
    1
}

fn default_active() -> bool {
    true
}

/// Paged product listing.
#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}
