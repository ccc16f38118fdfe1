//! In-app notifications.

use uuid::Uuid;

use crate::{db::DbPool, error::AppError, models::notification::Notification};

/// Notification kinds tied to order events.
pub const KIND_PAYMENT_SUCCESS: &str = "payment_success";
pub const KIND_ORDER_COMPLETED: &str = "order_completed";

/// Maximum notifications returned by a listing.
const LIST_LIMIT: i64 = 50;

/// Create an order notification unless one of the same kind exists.
///
/// Relies on the `(order_id, kind)` unique constraint. Returns whether a
/// row was inserted.
pub async fn notify_order_once(
    pool: &DbPool,
    user_id: Uuid,
    order_id: Uuid,
    kind: &str,
    title: &str,
    body: &str,
) -> Result<bool, AppError> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, order_id, kind, title, body)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (order_id, kind) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(order_id)
    .bind(kind)
    .bind(title)
    .bind(body)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(inserted > 0)
}

/// Newest notifications of a user.
pub async fn list_for_user(pool: &DbPool, user_id: Uuid) -> Result<Vec<Notification>, AppError> {
    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(LIST_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(notifications)
}

/// Mark one of the user's notifications as read.
///
/// # Errors
///
/// - `NotFound`: the notification does not exist or belongs to someone else
pub async fn mark_read(
    pool: &DbPool,
    user_id: Uuid,
    notification_id: Uuid,
) -> Result<Notification, AppError> {
    sqlx::query_as::<_, Notification>(
        "UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(notification_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Notification"))
}

/// Mark all of the user's notifications as read; returns how many changed.
pub async fn mark_all_read(pool: &DbPool, user_id: Uuid) -> Result<u64, AppError> {
    let updated = sqlx::query(
        "UPDATE notifications SET is_read = true WHERE user_id = $1 AND is_read = false",
    )
    .bind(user_id)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(updated)
}
