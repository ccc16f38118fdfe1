//! `GET /health` for load balancers and uptime checks.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,

    /// Active WhatsApp providers with at least one active key. Zero means
    /// payment messages will be logged as failed.
    pub whatsapp_providers: i64,

    pub admin_alerts: bool,
    pub timestamp: DateTime<Utc>,
}

/// Report liveness and messaging readiness.
///
/// An unreachable database surfaces as the regular 500 error body.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let whatsapp_providers: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(DISTINCT p.id)
        FROM whatsapp_providers p
        JOIN whatsapp_api_keys k ON k.provider_id = p.id AND k.is_active = true
        WHERE p.is_active = true
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        database: "connected",
        whatsapp_providers,
        admin_alerts: state.config.admin_whatsapp.is_some(),
        timestamp: Utc::now(),
    }))
}
