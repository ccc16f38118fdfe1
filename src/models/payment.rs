//! Payment models and gateway callback types.
//!
//! # Callback Flow
//!
//! 1. An order is created and an invoice is opened with the gateway
//! 2. The customer pays on the hosted invoice page
//! 3. The gateway POSTs a callback carrying `external_id`, invoice `id` and `status`
//! 4. The payment and order rows are reconciled against that callback

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::order::OrderStatus;

/// Payment status as stored in the `payments` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Expired,
    Failed,
}

impl PaymentStatus {
    /// Map a gateway status string onto a payment status.
    ///
    /// The gateway reports `SETTLED` once funds are disbursed after `PAID`;
    /// both mean the customer has paid. Matching is case-insensitive.
    /// Returns `None` for statuses this service does not track.
    pub fn from_gateway(status: &str) -> Option<Self> {
        match status.trim().to_ascii_uppercase().as_str() {
            "PAID" | "SETTLED" => Some(PaymentStatus::Paid),
            "PENDING" => Some(PaymentStatus::Pending),
            "EXPIRED" => Some(PaymentStatus::Expired),
            "FAILED" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }

    /// Order status a payment in this state drives the order towards.
    ///
    /// `Pending` carries no order change.
    pub fn order_status(self) -> Option<OrderStatus> {
        match self {
            PaymentStatus::Pending => None,
            PaymentStatus::Paid => Some(OrderStatus::Paid),
            PaymentStatus::Expired => Some(OrderStatus::Expired),
            PaymentStatus::Failed => Some(OrderStatus::Cancelled),
        }
    }

    /// Whether a stored payment may be overwritten with `next`.
    ///
    /// A paid payment is final; gateways occasionally redeliver an older
    /// `EXPIRED` or `PENDING` callback after `PAID`.
    pub fn can_become(self, next: PaymentStatus) -> bool {
        self != PaymentStatus::Paid || next == PaymentStatus::Paid
    }
}

/// Represents a payment record from the database.
///
/// # Database Table
///
/// Maps to the `payments` table. `external_id` mirrors the order's
/// `external_id` and is unique, which makes callback processing an upsert.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub external_id: String,
    pub xendit_invoice_id: Option<String>,
    pub amount: i64,
    pub status: PaymentStatus,
    pub payment_method: Option<String>,
    pub payment_channel: Option<String>,
    pub invoice_url: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,

    /// Last callback body received for this payment
    #[serde(skip_serializing)]
    pub raw_callback: Option<serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Invoice callback body sent by the gateway.
///
/// # Example
///
/// ```json
/// {
///   "id": "579c8d61f23fa4ca35e52da4",
///   "external_id": "ORD-20250101-AB12CD34",
///   "status": "PAID",
///   "amount": 150000,
///   "paid_amount": 150000,
///   "payment_method": "EWALLET",
///   "payment_channel": "OVO",
///   "paid_at": "2025-01-01T10:00:00.000Z"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceCallback {
    /// Gateway invoice id
    pub id: String,
    pub external_id: String,
    pub status: String,
    pub amount: f64,
    pub paid_amount: Option<f64>,
    pub payment_method: Option<String>,
    pub payment_channel: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl InvoiceCallback {
    /// Amount in whole rupiah, preferring the amount actually paid.
    pub fn amount_idr(&self) -> i64 {
        self.paid_amount.unwrap_or(self.amount).round() as i64
    }
}

/// Outcome of reconciling one callback against the database.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub order_id: Uuid,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,

    /// True when this callback moved the payment into `paid`
    #[serde(skip)]
    pub newly_paid: bool,
}

#[cfg(test)]
mod tests {
    use super::PaymentStatus::*;
    use super::*;

    #[test]
    fn gateway_statuses_are_normalized() {
        assert_eq!(PaymentStatus::from_gateway("PAID"), Some(Paid));
        assert_eq!(PaymentStatus::from_gateway("SETTLED"), Some(Paid));
        assert_eq!(PaymentStatus::from_gateway("paid"), Some(Paid));
        assert_eq!(PaymentStatus::from_gateway(" Expired "), Some(Expired));
        assert_eq!(PaymentStatus::from_gateway("PENDING"), Some(Pending));
        assert_eq!(PaymentStatus::from_gateway("FAILED"), Some(Failed));
        assert_eq!(PaymentStatus::from_gateway("REFUNDED"), None);
        assert_eq!(PaymentStatus::from_gateway("SUCCEEDED"), None);
        assert_eq!(PaymentStatus::from_gateway(""), None);
    }

    #[test]
    fn paid_is_never_downgraded() {
        assert!(!Paid.can_become(Expired));
        assert!(!Paid.can_become(Pending));
        assert!(!Paid.can_become(Failed));
        assert!(Paid.can_become(Paid));
        assert!(Pending.can_become(Paid));
        assert!(Expired.can_become(Paid));
    }

    #[test]
    fn payment_status_drives_order_status() {
        assert_eq!(Paid.order_status(), Some(OrderStatus::Paid));
        assert_eq!(Expired.order_status(), Some(OrderStatus::Expired));
        assert_eq!(Failed.order_status(), Some(OrderStatus::Cancelled));
        assert_eq!(Pending.order_status(), None);
    }

    #[test]
    fn callback_prefers_paid_amount() {
        let callback: InvoiceCallback = serde_json::from_value(serde_json::json!({
            "id": "inv-1",
            "external_id": "ORD-1",
            "status": "PAID",
            "amount": 150000,
            "paid_amount": 149999.6,
            "paid_at": "2025-01-01T10:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(callback.amount_idr(), 150_000);
        assert!(callback.paid_at.is_some());
        assert!(callback.payment_method.is_none());
    }
}
