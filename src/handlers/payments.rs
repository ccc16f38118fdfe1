//! Payment gateway callback endpoint.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};

use crate::{
    error::AppError,
    models::payment::InvoiceCallback,
    services::{
        payment_service::{self, CallbackAck},
        xendit,
    },
    state::AppState,
};

/// Header carrying the shared callback token.
pub const CALLBACK_TOKEN_HEADER: &str = "x-callback-token";

/// Receive an invoice callback.
///
/// # Endpoint
///
/// `POST /api/payments/xendit/webhook`
///
/// # Authentication
///
/// The `x-callback-token` header must equal the configured callback token.
///
/// # Response
///
/// - **200 OK**: `{"status":"ok","payment_status":…,"order_status":…}`
/// - **200 OK**: `{"status":"ignored"}` for statuses this service does not track
/// - **400**: body is not a valid invoice callback
/// - **401**: token missing or wrong
/// - **404**: no order matches the callback
///
/// Repeated deliveries of the same callback are safe; see `payment_service`.
pub async fn xendit_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CallbackAck>, AppError> {
    let provided = headers
        .get(CALLBACK_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    if !xendit::verify_callback_token(&state.config.xendit_callback_token, provided) {
        tracing::warn!("payment callback with invalid token");
        return Err(AppError::unauthorized("Invalid callback token"));
    }

    // Parsed only after the token check so unauthenticated garbage gets 401
    let raw: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::invalid(format!("Invalid callback body: {e}")))?;
    let callback: InvoiceCallback = serde_json::from_value(raw.clone())
        .map_err(|e| AppError::invalid(format!("Invalid callback body: {e}")))?;

    let ack = payment_service::handle_callback(&state, &callback, raw).await?;

    Ok(Json(ack))
}
