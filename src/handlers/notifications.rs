//! In-app notification handlers.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::notification::Notification,
    services::notification_service,
};

/// `GET /api/notifications` - the caller's latest notifications.
pub async fn list_notifications(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = notification_service::list_for_user(&pool, auth.user_id).await?;

    Ok(Json(notifications))
}

/// `POST /api/notifications/:id/read`
pub async fn mark_read(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Notification>, AppError> {
    let notification = notification_service::mark_read(&pool, auth.user_id, notification_id).await?;

    Ok(Json(notification))
}

/// `POST /api/notifications/read-all`
pub async fn mark_all_read(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let updated = notification_service::mark_all_read(&pool, auth.user_id).await?;

    Ok(Json(json!({ "updated": updated })))
}
