//! Product review handlers.
//!
//! - GET /api/products/:id/reviews - Visible reviews with average rating
//! - POST /api/reviews - Review one of your paid orders
//! - PATCH /api/admin/reviews/:id - Hide or show a review (admin)
//! - DELETE /api/admin/reviews/:id (admin)

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        order::{Order, OrderStatus},
        review::{
            CreateReviewRequest, ProductReviews, PublicReview, Review, ReviewVisibilityRequest,
        },
    },
};

const MAX_COMMENT_CHARS: usize = 1000;

pub async fn product_reviews(
    State(pool): State<DbPool>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ProductReviews>, AppError> {
    let reviews = sqlx::query_as::<_, PublicReview>(
        r#"
        SELECT r.id, u.name AS reviewer_name, r.rating, r.comment, r.created_at
        FROM reviews r
        JOIN users u ON u.id = r.user_id
        WHERE r.product_id = $1 AND r.is_visible
        ORDER BY r.created_at DESC
        "#,
    )
    .bind(product_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(ProductReviews {
        product_id,
        average_rating: average_rating(&reviews),
        count: reviews.len(),
        reviews,
    }))
}

/// Review an order.
///
/// # Rules
///
/// - The order must belong to the caller
/// - The order must be paid, processing or completed
/// - One review per order (409 on a second attempt)
/// - Rating 1 to 5
pub async fn create_review(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !(1..=5).contains(&request.rating) {
        return Err(AppError::invalid("rating must be between 1 and 5"));
    }
    let comment = request
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if comment
        .as_ref()
        .is_some_and(|c| c.chars().count() > MAX_COMMENT_CHARS)
    {
        return Err(AppError::invalid(format!(
            "comment must be at most {MAX_COMMENT_CHARS} characters"
        )));
    }

    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
        .bind(request.order_id)
        .bind(auth.user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    if !order.status.is_settled() {
        return Err(AppError::invalid(format!(
            "Orders with status '{}' cannot be reviewed",
            order.status.as_str()
        )));
    }

    let review = sqlx::query_as::<_, Review>(
        r#"
        INSERT INTO reviews (product_id, user_id, order_id, rating, comment)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (order_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(order.product_id)
    .bind(auth.user_id)
    .bind(order.id)
    .bind(request.rating)
    .bind(&comment)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::Conflict("This order has already been reviewed".to_string()))?;

    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn set_visibility(
    State(pool): State<DbPool>,
    Path(review_id): Path<Uuid>,
    Json(request): Json<ReviewVisibilityRequest>,
) -> Result<Json<Review>, AppError> {
    let review = sqlx::query_as::<_, Review>(
        "UPDATE reviews SET is_visible = $1 WHERE id = $2 RETURNING *",
    )
    .bind(request.is_visible)
    .bind(review_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Review"))?;

    Ok(Json(review))
}

pub async fn delete_review(
    State(pool): State<DbPool>,
    Path(review_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(review_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Review"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Mean rating rounded to one decimal; `None` without reviews.
fn average_rating(reviews: &[PublicReview]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let sum: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
    let mean = sum as f64 / reviews.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn review(rating: i16) -> PublicReview {
        PublicReview {
            id: Uuid::new_v4(),
            reviewer_name: "Budi".into(),
            rating,
            comment: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn average_is_rounded_to_one_decimal() {
        assert_eq!(average_rating(&[]), None);
        assert_eq!(average_rating(&[review(5), review(4), review(4)]), Some(4.3));
        assert_eq!(average_rating(&[review(3)]), Some(3.0));
    }

    #[test]
    fn only_settled_orders_are_reviewable() {
        assert!(OrderStatus::Completed.is_settled());
        assert!(!OrderStatus::Pending.is_settled());
        assert!(!OrderStatus::Cancelled.is_settled());
    }
}
