//! Product catalog handlers.
//!
//! Public:
//! - GET /api/products - Paged listing with filters
//! - GET /api/products/:id - Product details
//!
//! Admin:
//! - POST /api/admin/products
//! - PUT /api/admin/products/:id
//! - DELETE /api/admin/products/:id (soft delete)

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::product::{Product, ProductPage, ProductQuery, ProductRequest},
    validation,
};

/// List active products.
///
/// # Query Parameters
///
/// - `game`: exact game name
/// - `product_type`: `account` or `service`
/// - `q`: case-insensitive title search
/// - `page`, `per_page`: 1-based paging, `per_page` capped at 100
///
/// # Ordering
///
/// Newest first.
pub async fn list_products(
    State(pool): State<DbPool>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductPage>, AppError> {
    let (limit, offset) = query.limit_offset();
    let search = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|q| format!("%{}%", escape_like(q)));

    let filter = r#"
        WHERE is_active = true
          AND ($1::text IS NULL OR game = $1)
          AND ($2::product_type IS NULL OR product_type = $2)
          AND ($3::text IS NULL OR title ILIKE $3)
    "#;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products {filter}"))
        .bind(&query.game)
        .bind(query.product_type)
        .bind(&search)
        .fetch_one(&pool)
        .await?;

    let items = sqlx::query_as::<_, Product>(&format!(
        "SELECT * FROM products {filter} ORDER BY created_at DESC LIMIT $4 OFFSET $5"
    ))
    .bind(&query.game)
    .bind(query.product_type)
    .bind(&search)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    Ok(Json(ProductPage {
        items,
        page: offset / limit + 1,
        per_page: limit,
        total,
    }))
}

/// Get one active product.
pub async fn get_product(
    State(pool): State<DbPool>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    let product = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE id = $1 AND is_active = true",
    )
    .bind(product_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Product"))?;

    Ok(Json(product))
}

/// Create a product (admin).
///
/// # Response
///
/// - **201 Created**: the product
/// - **400**: validation failure
pub async fn create_product(
    State(pool): State<DbPool>,
    Json(request): Json<ProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = validate_product(request)?;

    let product = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (
            title, description, game, product_type, price,
            rental_price_per_hour, stock, images, is_active
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(&request.title)
    .bind(&request.description)
    .bind(&request.game)
    .bind(request.product_type)
    .bind(request.price)
    .bind(request.rental_price_per_hour)
    .bind(request.stock)
    .bind(serde_json::json!(request.images))
    .bind(request.is_active)
    .fetch_one(&pool)
    .await?;

    tracing::info!(product_id = %product.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product (admin).
pub async fn update_product(
    State(pool): State<DbPool>,
    Path(product_id): Path<Uuid>,
    Json(request): Json<ProductRequest>,
) -> Result<Json<Product>, AppError> {
    let request = validate_product(request)?;

    let product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET title = $1,
            description = $2,
            game = $3,
            product_type = $4,
            price = $5,
            rental_price_per_hour = $6,
            stock = $7,
            images = $8,
            is_active = $9,
            updated_at = NOW()
        WHERE id = $10
        RETURNING *
        "#,
    )
    .bind(&request.title)
    .bind(&request.description)
    .bind(&request.game)
    .bind(request.product_type)
    .bind(request.price)
    .bind(request.rental_price_per_hour)
    .bind(request.stock)
    .bind(serde_json::json!(request.images))
    .bind(request.is_active)
    .bind(product_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Product"))?;

    Ok(Json(product))
}

/// Deactivate a product (admin).
///
/// Products stay in the database because orders and reviews reference them.
pub async fn delete_product(
    State(pool): State<DbPool>,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query(
        "UPDATE products SET is_active = false, updated_at = NOW() WHERE id = $1",
    )
    .bind(product_id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Product"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Validate and trim a product request.
pub fn validate_product(mut request: ProductRequest) -> Result<ProductRequest, AppError> {
    request.title = validation::required_text("title", &request.title, 200)?;
    request.game = validation::required_text("game", &request.game, 100)?;
    request.description = request.description.trim().to_string();

    if request.price <= 0 {
        return Err(AppError::invalid("price must be positive"));
    }
    if request.rental_price_per_hour.is_some_and(|p| p <= 0) {
        return Err(AppError::invalid("rental_price_per_hour must be positive"));
    }
    if request.stock < 0 {
        return Err(AppError::invalid("stock cannot be negative"));
    }
    for image in &request.images {
        validation::validate_http_url("images", image)?;
    }

    Ok(request)
}

/// Escape `%`, `_` and `\` so user input matches literally inside ILIKE.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
