//! Product review models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a review record from the database.
///
/// Each review is tied to the order it reviews; `order_id` is unique.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
}

/// Review as shown on a product page.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PublicReview {
    pub id: Uuid,
    pub reviewer_name: String,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Response body for `GET /api/products/{id}/reviews`.
#[derive(Debug, Serialize)]
pub struct ProductReviews {
    pub product_id: Uuid,
    pub average_rating: Option<f64>,
    pub count: usize,
    pub reviews: Vec<PublicReview>,
}

/// Request body for `POST /api/reviews`.
#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub order_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
}

/// Request body for `PATCH /api/admin/reviews/{id}`.
#[derive(Debug, Deserialize)]
pub struct ReviewVisibilityRequest {
    pub is_visible: bool,
}
