//! Admin dashboard statistics.

use std::collections::BTreeMap;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::{db::DbPool, error::AppError, models::order::OrderStatus};

/// Dashboard summary.
///
/// # JSON Example
///
/// ```json
/// {
///   "users": 120,
///   "active_products": 48,
///   "orders_by_status": { "pending": 3, "paid": 5, "completed": 40 },
///   "pending_orders": 3,
///   "revenue": 18250000
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub users: i64,
    pub active_products: i64,
    pub orders_by_status: BTreeMap<&'static str, i64>,
    pub pending_orders: i64,

    /// Sum of `total_amount` over paid, processing and completed orders
    pub revenue: i64,
}

pub async fn stats(State(pool): State<DbPool>) -> Result<Json<StatsResponse>, AppError> {
    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await?;

    let active_products: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = true")
            .fetch_one(&pool)
            .await?;

    let rows: Vec<(OrderStatus, i64, i64)> = sqlx::query_as(
        "SELECT status, COUNT(*), COALESCE(SUM(total_amount), 0)::BIGINT FROM orders GROUP BY status",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(summarize(users, active_products, &rows)))
}

/// Fold per-status `(status, count, amount)` rows into the dashboard summary.
fn summarize(users: i64, active_products: i64, rows: &[(OrderStatus, i64, i64)]) -> StatsResponse {
    let mut orders_by_status = BTreeMap::new();
    let mut revenue = 0;
    let mut pending_orders = 0;

    for &(status, count, amount) in rows {
        orders_by_status.insert(status.as_str(), count);
        if status.is_settled() {
            revenue += amount;
        }
        if status == OrderStatus::Pending {
            pending_orders = count;
        }
    }

    StatsResponse {
        users,
        active_products,
        orders_by_status,
        pending_orders,
        revenue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revenue_counts_only_settled_orders() {
        let rows = [
            (OrderStatus::Pending, 2, 300_000),
            (OrderStatus::Paid, 1, 150_000),
            (OrderStatus::Completed, 3, 450_000),
            (OrderStatus::Cancelled, 4, 999_000),
        ];

        let stats = summarize(10, 5, &rows);

        assert_eq!(stats.revenue, 600_000);
        assert_eq!(stats.pending_orders, 2);
        assert_eq!(stats.orders_by_status["cancelled"], 4);
        assert_eq!(stats.orders_by_status.len(), 4);
    }
}
