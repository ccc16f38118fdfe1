//! Order data models and API request/response types.
//!
//! This module defines:
//! - `Order`: Database entity representing a purchase or rental
//! - `OrderStatus`: lifecycle states and the legal transitions between them
//! - Request types for creating orders and changing their status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Purchase,
    Rental,
}

/// Order lifecycle status.
///
/// ```text
/// pending ──► paid ──► processing ──► completed
///    │          │           │
///    ├──► expired            │
///    └──► cancelled ◄───────┴── (from paid / processing)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Completed,
    Cancelled,
    Expired,
}

impl OrderStatus {
    /// Whether an order may move from `self` to `next`.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid | Cancelled | Expired)
                | (Paid, Processing | Completed | Cancelled)
                | (Processing, Completed | Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }

    /// Statuses whose orders count as paid for revenue and reviews.
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            OrderStatus::Paid | OrderStatus::Processing | OrderStatus::Completed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
        }
    }
}

/// Represents an order record from the database.
///
/// # Database Table
///
/// Maps to the `orders` table. `external_id` is the reference shared with
/// the payment gateway and is unique; it is how callbacks find the order.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub external_id: String,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub order_type: OrderType,

    /// Rental length in hours, only for rentals
    pub rental_hours: Option<i32>,

    /// Price per unit at order time (per item for purchases, per hour for rentals)
    pub unit_price: i64,

    pub total_amount: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub status: OrderStatus,

    /// Hosted invoice URL the customer pays on
    pub payment_url: Option<String>,

    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /api/orders`.
///
/// # JSON Example
///
/// ```json
/// {
///   "product_id": "550e8400-e29b-41d4-a716-446655440000",
///   "order_type": "rental",
///   "rental_hours": 6,
///   "customer_name": "Budi",
///   "customer_phone": "081234567890",
///   "customer_email": "budi@example.com"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub product_id: Uuid,
    pub order_type: OrderType,
    pub rental_hours: Option<i32>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
}

/// Request body for `PATCH /api/admin/orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

/// Query string for the admin order listing.
#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
}
