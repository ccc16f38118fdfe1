//! Storefront banner handlers.
//!
//! - GET /api/banners - Active banners
//! - GET /api/admin/banners - All banners (admin)
//! - POST /api/admin/banners (admin)
//! - PUT /api/admin/banners/:id (admin)
//! - DELETE /api/admin/banners/:id (admin)

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
    models::banner::{Banner, BannerRequest},
    validation,
};

/// Active banners in display order.
pub async fn list_active(State(pool): State<DbPool>) -> Result<Json<Vec<Banner>>, AppError> {
    let banners = sqlx::query_as::<_, Banner>(
        "SELECT * FROM banners WHERE is_active = true ORDER BY sort_order ASC, created_at DESC",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(banners))
}

pub async fn list_all(State(pool): State<DbPool>) -> Result<Json<Vec<Banner>>, AppError> {
    let banners = sqlx::query_as::<_, Banner>(
        "SELECT * FROM banners ORDER BY sort_order ASC, created_at DESC",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(banners))
}

pub async fn create_banner(
    State(pool): State<DbPool>,
    Json(request): Json<BannerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = validate_banner(request)?;

    let banner = sqlx::query_as::<_, Banner>(
        r#"
        INSERT INTO banners (title, image_url, link_url, sort_order, is_active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&request.title)
    .bind(&request.image_url)
    .bind(&request.link_url)
    .bind(request.sort_order)
    .bind(request.is_active)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(banner)))
}

pub async fn update_banner(
    State(pool): State<DbPool>,
    Path(banner_id): Path<Uuid>,
    Json(request): Json<BannerRequest>,
) -> Result<Json<Banner>, AppError> {
    let request = validate_banner(request)?;

    let banner = sqlx::query_as::<_, Banner>(
        r#"
        UPDATE banners
        SET title = $1, image_url = $2, link_url = $3, sort_order = $4, is_active = $5
        WHERE id = $6
        RETURNING *
        "#,
    )
    .bind(&request.title)
    .bind(&request.image_url)
    .bind(&request.link_url)
    .bind(request.sort_order)
    .bind(request.is_active)
    .bind(banner_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Banner"))?;

    Ok(Json(banner))
}

pub async fn delete_banner(
    State(pool): State<DbPool>,
    Path(banner_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM banners WHERE id = $1")
        .bind(banner_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Banner"));
    }

    Ok(StatusCode::NO_CONTENT)
}

fn validate_banner(mut request: BannerRequest) -> Result<BannerRequest, AppError> {
    request.title = validation::required_text("title", &request.title, 200)?;
    validation::validate_http_url("image_url", &request.image_url)?;

    request.link_url = request
        .link_url
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());
    if let Some(link) = &request.link_url {
        validation::validate_http_url("link_url", link)?;
    }

    Ok(request)
}
