//! Order HTTP handlers.
//!
//! Customer:
//! - POST /api/orders - Create an order and open its invoice
//! - GET /api/orders - Your orders
//! - GET /api/orders/:id - Order details
//! - GET /api/orders/:id/payment - Payment row of an order
//! - POST /api/orders/:id/payment/sync - Re-check the invoice with the gateway
//!
//! Admin:
//! - GET /api/admin/orders?status= - All orders
//! - PATCH /api/admin/orders/:id/status - Move an order along its lifecycle

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        order::{CreateOrderRequest, Order, OrderQuery, UpdateOrderStatusRequest},
        payment::Payment,
    },
    services::{
        order_service,
        payment_service::{self, CallbackAck},
    },
    state::AppState,
};

/// Default and maximum page size of the admin listing.
const ADMIN_LIST_DEFAULT: i64 = 50;
const ADMIN_LIST_MAX: i64 = 200;

/// Create an order.
///
/// # Request Body
///
/// ```json
/// {
///   "product_id": "550e8400-...",
///   "order_type": "purchase",
///   "customer_name": "Budi",
///   "customer_phone": "081234567890"
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the order, including `payment_url`
/// - **404**: product missing or inactive
/// - **409**: product out of stock
/// - **502**: the invoice could not be opened (the order is cancelled)
pub async fn create_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let order = order_service::create_order(&state, &auth, request).await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// The caller's orders, newest first.
pub async fn list_my_orders(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(orders))
}

/// Get an order.
///
/// Returns 404 for orders of other users so their existence is not leaked.
pub async fn get_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = order_service::get_order_for(&state.pool, &auth, order_id).await?;

    Ok(Json(order))
}

pub async fn get_order_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Payment>, AppError> {
    let order = order_service::get_order_for(&state.pool, &auth, order_id).await?;
    let payment = order_service::get_payment_for_order(&state.pool, order.id).await?;

    Ok(Json(payment))
}

/// Fetch the invoice from the gateway and reconcile it, for callbacks that
/// never arrived.
pub async fn sync_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<CallbackAck>, AppError> {
    let ack = payment_service::sync_from_gateway(&state, &auth, order_id).await?;

    Ok(Json(ack))
}

/// All orders, optionally filtered by status (admin).
pub async fn admin_list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let limit = query
        .limit
        .unwrap_or(ADMIN_LIST_DEFAULT)
        .clamp(1, ADMIN_LIST_MAX);

    let orders = sqlx::query_as::<_, Order>(
        r#"
        SELECT * FROM orders
        WHERE ($1::order_status IS NULL OR status = $1)
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(query.status)
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(orders))
}

/// Change an order's status (admin).
///
/// # Response
///
/// - **200 OK**: the updated order
/// - **400**: `paid`/`expired`/`pending` requested; those come from the gateway
/// - **409**: transition not allowed from the current status
pub async fn admin_update_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let order = order_service::update_status(&state, order_id, request.status).await?;

    Ok(Json(order))
}
