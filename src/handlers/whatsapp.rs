//! WhatsApp provider administration.
//!
//! - GET/POST /api/admin/whatsapp/providers
//! - PUT/DELETE /api/admin/whatsapp/providers/:id
//! - GET/POST /api/admin/whatsapp/providers/:id/keys
//! - DELETE /api/admin/whatsapp/keys/:id (deactivate)
//! - GET /api/admin/whatsapp/logs?limit=
//! - POST /api/admin/whatsapp/test

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::whatsapp::{
        ApiKeyRequest, ApiKeyResponse, LogQuery, MessageKind, MessageLog, ProviderRequest,
        TestMessageRequest, WhatsAppApiKey, WhatsAppProvider,
    },
    services::whatsapp_service,
    state::AppState,
    validation,
};

const LOG_LIMIT_DEFAULT: i64 = 100;
const LOG_LIMIT_MAX: i64 = 500;

pub async fn list_providers(
    State(pool): State<DbPool>,
) -> Result<Json<Vec<WhatsAppProvider>>, AppError> {
    let providers = sqlx::query_as::<_, WhatsAppProvider>(
        "SELECT * FROM whatsapp_providers ORDER BY priority ASC, created_at ASC",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(providers))
}

pub async fn create_provider(
    State(pool): State<DbPool>,
    Json(request): Json<ProviderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = validate_provider(request)?;

    let provider = sqlx::query_as::<_, WhatsAppProvider>(
        r#"
        INSERT INTO whatsapp_providers (name, base_url, is_active, priority)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&request.name)
    .bind(&request.base_url)
    .bind(request.is_active)
    .bind(request.priority)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(provider)))
}

pub async fn update_provider(
    State(pool): State<DbPool>,
    Path(provider_id): Path<Uuid>,
    Json(request): Json<ProviderRequest>,
) -> Result<Json<WhatsAppProvider>, AppError> {
    let request = validate_provider(request)?;

    let provider = sqlx::query_as::<_, WhatsAppProvider>(
        r#"
        UPDATE whatsapp_providers
        SET name = $1, base_url = $2, is_active = $3, priority = $4
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(&request.name)
    .bind(&request.base_url)
    .bind(request.is_active)
    .bind(request.priority)
    .bind(provider_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Provider"))?;

    Ok(Json(provider))
}

/// Delete a provider and its keys. Message logs keep their rows with the
/// provider reference cleared.
pub async fn delete_provider(
    State(pool): State<DbPool>,
    Path(provider_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM whatsapp_providers WHERE id = $1")
        .bind(provider_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Provider"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Keys of a provider; only fingerprints are returned.
pub async fn list_keys(
    State(pool): State<DbPool>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Vec<ApiKeyResponse>>, AppError> {
    let keys = sqlx::query_as::<_, WhatsAppApiKey>(
        "SELECT * FROM whatsapp_api_keys WHERE provider_id = $1 ORDER BY created_at ASC",
    )
    .bind(provider_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(keys.into_iter().map(Into::into).collect()))
}

/// Add a key to a provider.
///
/// The key itself is never echoed back.
pub async fn add_key(
    State(pool): State<DbPool>,
    Path(provider_id): Path<Uuid>,
    Json(request): Json<ApiKeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let api_key = validation::required_text("api_key", &request.api_key, 512)?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM whatsapp_providers WHERE id = $1)")
            .bind(provider_id)
            .fetch_one(&pool)
            .await?;
    if !exists {
        return Err(AppError::NotFound("Provider"));
    }

    let key = sqlx::query_as::<_, WhatsAppApiKey>(
        "INSERT INTO whatsapp_api_keys (provider_id, api_key) VALUES ($1, $2) RETURNING *",
    )
    .bind(provider_id)
    .bind(&api_key)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(ApiKeyResponse::from(key))))
}

/// Deactivate a key (soft delete).
pub async fn deactivate_key(
    State(pool): State<DbPool>,
    Path(key_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("UPDATE whatsapp_api_keys SET is_active = false WHERE id = $1")
        .bind(key_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("API key"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Latest send attempts, newest first.
pub async fn list_logs(
    State(pool): State<DbPool>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<MessageLog>>, AppError> {
    let limit = query.limit.unwrap_or(LOG_LIMIT_DEFAULT).clamp(1, LOG_LIMIT_MAX);

    let logs = sqlx::query_as::<_, MessageLog>(
        "SELECT * FROM whatsapp_message_logs ORDER BY created_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(logs))
}

/// Send an ad-hoc message through the current provider.
///
/// Unlike order notifications, a failure here is returned to the caller.
pub async fn send_test(
    State(state): State<AppState>,
    Json(request): Json<TestMessageRequest>,
) -> Result<Json<Value>, AppError> {
    let phone = validation::validate_phone(&request.phone)?;
    let message = validation::required_text("message", &request.message, 4096)?;

    whatsapp_service::send_message(
        &state.pool,
        &state.http,
        &phone,
        MessageKind::Test,
        &message,
        None,
    )
    .await?;

    Ok(Json(json!({ "status": "sent", "target": phone })))
}

fn validate_provider(mut request: ProviderRequest) -> Result<ProviderRequest, AppError> {
    request.name = validation::required_text("name", &request.name, 100)?;
    request.base_url = request.base_url.trim().to_string();
    validation::validate_http_url("base_url", &request.base_url)?;
    Ok(request)
}
