//! WhatsApp provider, API key, and message log models.
//!
//! Providers are HTTP gateways that deliver WhatsApp messages. Each provider
//! holds one or more API keys; the active provider with the lowest
//! `priority` that still has an active key is used for sending.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Represents a WhatsApp provider record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct WhatsAppProvider {
    pub id: Uuid,
    pub name: String,

    /// Send endpoint, receives `POST {"target", "message"}`
    pub base_url: String,

    pub is_active: bool,

    /// Lower goes first
    pub priority: i32,

    pub created_at: DateTime<Utc>,
}

/// Request body for creating or replacing a provider (admin).
#[derive(Debug, Deserialize)]
pub struct ProviderRequest {
    pub name: String,
    pub base_url: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub priority: i32,
}

fn default_active() -> bool {
    true
}

/// Represents a provider API key record from the database.
///
/// The key is stored in plaintext because it must be sent to the provider,
/// but it is never returned by the API; responses carry a fingerprint.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WhatsAppApiKey {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub api_key: String,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /api/admin/whatsapp/providers/{id}/keys`.
#[derive(Debug, Deserialize)]
pub struct ApiKeyRequest {
    pub api_key: String,
}

/// API view of a provider key.
///
/// # Example
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "provider_id": "660e8400-e29b-41d4-a716-446655440001",
///   "fingerprint": "9f86d081884c",
///   "is_active": true,
///   "last_used_at": null,
///   "created_at": "2025-01-15T10:30:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub fingerprint: String,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<WhatsAppApiKey> for ApiKeyResponse {
    fn from(key: WhatsAppApiKey) -> Self {
        Self {
            id: key.id,
            provider_id: key.provider_id,
            fingerprint: key_fingerprint(&key.api_key),
            is_active: key.is_active,
            last_used_at: key.last_used_at,
            created_at: key.created_at,
        }
    }
}

/// First 12 hex characters of the SHA-256 of a key.
///
/// Enough for an admin to tell keys apart without exposing them.
pub fn key_fingerprint(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(12);
    hex
}

/// Provider joined with its active key, ready for sending.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProviderCredential {
    pub provider_id: Uuid,
    pub provider_name: String,
    pub base_url: String,
    pub key_id: Uuid,
    pub api_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Failed,
}

/// Kind of templated message, stored as `message_type` in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// To the customer, after payment succeeds
    PaymentSuccess,
    /// To the admin, after a customer pays
    NewOrderPaid,
    /// To the customer, when the admin completes the order
    OrderCompleted,
    /// Ad-hoc message sent from the admin panel
    Test,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::PaymentSuccess => "payment_success",
            MessageKind::NewOrderPaid => "new_order_paid",
            MessageKind::OrderCompleted => "order_completed",
            MessageKind::Test => "test",
        }
    }
}

/// Represents a WhatsApp message log record from the database.
///
/// Every send attempt is logged, successful or not. A `sent` row for an
/// (order, message_type) pair is what keeps repeated webhooks from
/// messaging the customer twice.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct MessageLog {
    pub id: Uuid,
    pub order_id: Option<Uuid>,
    pub phone: String,
    pub message_type: String,
    pub message: String,
    pub status: MessageStatus,
    pub provider_id: Option<Uuid>,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Query string for `GET /api/admin/whatsapp/logs`.
#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub limit: Option<i64>,
}

/// Request body for `POST /api/admin/whatsapp/test`.
#[derive(Debug, Deserialize)]
pub struct TestMessageRequest {
    pub phone: String,
    pub message: String,
}

/// JSON body posted to the provider.
#[derive(Debug, Serialize)]
pub struct OutboundMessage<'a> {
    pub target: &'a str,
    pub message: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_short() {
        let a = key_fingerprint("secret-key");
        assert_eq!(a.len(), 12);
        assert_eq!(a, key_fingerprint("secret-key"));
        assert_ne!(a, key_fingerprint("other-key"));
        assert!(!a.contains("secret"));
    }
}
