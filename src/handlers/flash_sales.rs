//! Flash sale handlers.
//!
//! Public:
//! - GET /api/flash-sales - Sales live right now
//!
//! Admin:
//! - GET /api/admin/flash-sales - All sales
//! - POST /api/admin/flash-sales
//! - PUT /api/admin/flash-sales/:id
//! - DELETE /api/admin/flash-sales/:id

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::flash_sale::{FlashSale, FlashSaleListing, FlashSaleRequest},
};

/// Sales live right now, soonest ending first.
///
/// Inactive products are left out.
pub async fn list_live(State(pool): State<DbPool>) -> Result<Json<Vec<FlashSaleListing>>, AppError> {
    let sales = sqlx::query_as::<_, FlashSaleListing>(
        r#"
        SELECT f.id,
               f.product_id,
               p.title AS product_title,
               p.game,
               p.price AS original_price,
               f.sale_price,
               f.starts_at,
               f.ends_at
        FROM flash_sales f
        JOIN products p ON p.id = f.product_id
        WHERE f.is_active
          AND p.is_active
          AND f.starts_at <= NOW()
          AND f.ends_at > NOW()
        ORDER BY f.ends_at ASC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(sales))
}

/// All sales, newest first (admin).
pub async fn list_all(State(pool): State<DbPool>) -> Result<Json<Vec<FlashSale>>, AppError> {
    let sales = sqlx::query_as::<_, FlashSale>("SELECT * FROM flash_sales ORDER BY starts_at DESC")
        .fetch_all(&pool)
        .await?;

    Ok(Json(sales))
}

/// Create a flash sale (admin).
///
/// # Validation
///
/// - `ends_at` must be after `starts_at`
/// - `sale_price` must be positive and below the product price
pub async fn create_flash_sale(
    State(pool): State<DbPool>,
    Json(request): Json<FlashSaleRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_flash_sale(&pool, &request).await?;

    let sale = sqlx::query_as::<_, FlashSale>(
        r#"
        INSERT INTO flash_sales (product_id, sale_price, starts_at, ends_at, is_active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(request.product_id)
    .bind(request.sale_price)
    .bind(request.starts_at)
    .bind(request.ends_at)
    .bind(request.is_active)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(sale)))
}

/// Replace a flash sale (admin).
pub async fn update_flash_sale(
    State(pool): State<DbPool>,
    Path(sale_id): Path<Uuid>,
    Json(request): Json<FlashSaleRequest>,
) -> Result<Json<FlashSale>, AppError> {
    validate_flash_sale(&pool, &request).await?;

    let sale = sqlx::query_as::<_, FlashSale>(
        r#"
        UPDATE flash_sales
        SET product_id = $1, sale_price = $2, starts_at = $3, ends_at = $4, is_active = $5
        WHERE id = $6
        RETURNING *
        "#,
    )
    .bind(request.product_id)
    .bind(request.sale_price)
    .bind(request.starts_at)
    .bind(request.ends_at)
    .bind(request.is_active)
    .bind(sale_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Flash sale"))?;

    Ok(Json(sale))
}

/// Delete a flash sale (admin).
pub async fn delete_flash_sale(
    State(pool): State<DbPool>,
    Path(sale_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM flash_sales WHERE id = $1")
        .bind(sale_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Flash sale"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn validate_flash_sale(pool: &DbPool, request: &FlashSaleRequest) -> Result<(), AppError> {
    if request.ends_at <= request.starts_at {
        return Err(AppError::invalid("ends_at must be after starts_at"));
    }

    let price: i64 = sqlx::query_scalar("SELECT price FROM products WHERE id = $1")
        .bind(request.product_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    check_sale_price(request.sale_price, price)
}

/// A sale price must be positive and strictly below the list price.
fn check_sale_price(sale_price: i64, list_price: i64) -> Result<(), AppError> {
    if sale_price <= 0 || sale_price >= list_price {
        return Err(AppError::invalid(
            "sale_price must be positive and below the product price",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_price_must_discount() {
        assert!(check_sale_price(99_000, 150_000).is_ok());
        assert!(check_sale_price(150_000, 150_000).is_err());
        assert!(check_sale_price(0, 150_000).is_err());
    }
}
