//! WhatsApp delivery: provider selection, sending, and message logging.
//!
//! Every attempt is written to `whatsapp_message_logs` whether it succeeds
//! or not. Callers treat delivery as secondary: failures are logged here
//! and returned, and the caller decides whether to swallow them.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        order::Order,
        whatsapp::{MessageKind, MessageStatus, OutboundMessage, ProviderCredential},
    },
    validation,
};

/// Provider responses longer than this are truncated before logging.
const MAX_LOGGED_RESPONSE: usize = 2000;

/// Pick the provider to send through.
///
/// The active provider with the lowest priority that has an active key;
/// among its keys the least recently used one.
pub async fn select_provider(pool: &DbPool) -> Result<Option<ProviderCredential>, AppError> {
    let credential = sqlx::query_as::<_, ProviderCredential>(
        r#"
        SELECT p.id AS provider_id,
               p.name AS provider_name,
               p.base_url,
               k.id AS key_id,
               k.api_key
        FROM whatsapp_providers p
        JOIN whatsapp_api_keys k ON k.provider_id = p.id AND k.is_active
        WHERE p.is_active
        ORDER BY p.priority ASC, k.last_used_at ASC NULLS FIRST, k.created_at ASC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    Ok(credential)
}

/// Whether a message of `kind` was already delivered for `order_id`.
pub async fn already_sent(
    pool: &DbPool,
    order_id: Uuid,
    kind: MessageKind,
) -> Result<bool, AppError> {
    let sent: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM whatsapp_message_logs
            WHERE order_id = $1 AND message_type = $2 AND status = 'sent'
        )
        "#,
    )
    .bind(order_id)
    .bind(kind.as_str())
    .fetch_one(pool)
    .await?;

    Ok(sent)
}

/// Send one message and log the attempt.
///
/// # Process
///
/// 1. Normalize the phone number
/// 2. Select a provider; with none available, log a failure
/// 3. POST `{"target", "message"}` with the key in the `Authorization` header
/// 4. Mark the key as used
/// 5. Record the attempt in `whatsapp_message_logs`
///
/// # Errors
///
/// - `Gateway`: no provider, transport error, or non-2xx response
/// - `Database`: the log could not be written
pub async fn send_message(
    pool: &DbPool,
    http: &reqwest::Client,
    phone: &str,
    kind: MessageKind,
    message: &str,
    order_id: Option<Uuid>,
) -> Result<(), AppError> {
    let target = validation::normalize_phone(phone);

    let Some(credential) = select_provider(pool).await? else {
        record(
            pool,
            order_id,
            &target,
            kind,
            message,
            MessageStatus::Failed,
            None,
            Some("no active provider"),
        )
        .await?;
        return Err(AppError::Gateway("no active WhatsApp provider".to_string()));
    };

    let result = http
        .post(&credential.base_url)
        .header("Authorization", &credential.api_key)
        .json(&OutboundMessage {
            target: &target,
            message,
        })
        .send()
        .await;

    sqlx::query("UPDATE whatsapp_api_keys SET last_used_at = NOW() WHERE id = $1")
        .bind(credential.key_id)
        .execute(pool)
        .await?;

    let (status, response_text) = match result {
        Ok(resp) => {
            let ok = resp.status().is_success();
            let code = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            let status = if ok {
                MessageStatus::Sent
            } else {
                MessageStatus::Failed
            };
            (status, format!("{code} {body}"))
        }
        Err(e) => (MessageStatus::Failed, format!("request failed: {e}")),
    };

    record(
        pool,
        order_id,
        &target,
        kind,
        message,
        status,
        Some(credential.provider_id),
        Some(&response_text),
    )
    .await?;

    match status {
        MessageStatus::Sent => {
            tracing::info!(
                provider = %credential.provider_name,
                message_type = kind.as_str(),
                "whatsapp message sent"
            );
            Ok(())
        }
        MessageStatus::Failed => {
            tracing::warn!(
                provider = %credential.provider_name,
                message_type = kind.as_str(),
                response = %response_text,
                "whatsapp message failed"
            );
            Err(AppError::Gateway(format!(
                "{} rejected message: {}",
                credential.provider_name, response_text
            )))
        }
    }
}

/// Send a templated order message once.
///
/// Skips the send when a `sent` log already exists for (order, kind).
/// Returns whether a message went out.
pub async fn send_order_message_once(
    pool: &DbPool,
    http: &reqwest::Client,
    phone: &str,
    kind: MessageKind,
    order: &Order,
    message: &str,
) -> Result<bool, AppError> {
    if already_sent(pool, order.id, kind).await? {
        tracing::debug!(order_id = %order.id, message_type = kind.as_str(), "already notified");
        return Ok(false);
    }

    send_message(pool, http, phone, kind, message, Some(order.id)).await?;
    Ok(true)
}

#[allow(clippy::too_many_arguments)]
async fn record(
    pool: &DbPool,
    order_id: Option<Uuid>,
    phone: &str,
    kind: MessageKind,
    message: &str,
    status: MessageStatus,
    provider_id: Option<Uuid>,
    response: Option<&str>,
) -> Result<(), AppError> {
    let response = response.map(|r| truncate(r, MAX_LOGGED_RESPONSE));

    sqlx::query(
        r#"
        INSERT INTO whatsapp_message_logs (
            order_id, phone, message_type, message, status, provider_id, response
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(order_id)
    .bind(phone)
    .bind(kind.as_str())
    .bind(message)
    .bind(status)
    .bind(provider_id)
    .bind(response)
    .execute(pool)
    .await?;

    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Format whole rupiah with dot thousands separators: `1500000` → `Rp1.500.000`.
pub fn format_idr(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}Rp{grouped}")
}

/// Customer message after a successful payment.
pub fn payment_success_message(order: &Order, product_title: &str) -> String {
    format!(
        "Halo {}, pembayaran untuk pesanan {} ({}) sebesar {} sudah kami terima. \
         Pesanan kamu sedang kami proses.",
        order.customer_name,
        order.external_id,
        product_title,
        format_idr(order.total_amount)
    )
}

/// Admin message after a customer pays.
pub fn new_order_paid_message(order: &Order, product_title: &str) -> String {
    format!(
        "Pesanan baru dibayar: {}\nProduk: {}\nPelanggan: {} ({})\nTotal: {}",
        order.external_id,
        product_title,
        order.customer_name,
        order.customer_phone,
        format_idr(order.total_amount)
    )
}

/// Customer message when an order is completed.
pub fn order_completed_message(order: &Order, product_title: &str) -> String {
    format!(
        "Halo {}, pesanan {} ({}) sudah selesai. Terima kasih sudah berbelanja!",
        order.customer_name, order.external_id, product_title
    )
}
