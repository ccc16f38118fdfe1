//! Xendit invoice API client and callback verification.
//!
//! Only the invoice product is used: an invoice is opened per order, the
//! customer pays on the hosted page, and the gateway reports the result
//! through a callback carrying a shared `x-callback-token`.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Invoice creation request body.
///
/// # Example
///
/// ```json
/// {
///   "external_id": "ORD-20250101-AB12CD34",
///   "amount": 150000,
///   "description": "Mythic account, 300 skins",
///   "invoice_duration": 86400,
///   "success_redirect_url": "https://shop.example.com/orders/...?status=success",
///   "failure_redirect_url": "https://shop.example.com/orders/...?status=failed",
///   "customer": { "given_names": "Budi", "mobile_number": "+6281234567890" }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct CreateInvoice {
    pub external_id: String,
    pub amount: i64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_email: Option<String>,
    pub invoice_duration: u64,
    pub success_redirect_url: String,
    pub failure_redirect_url: String,
    pub currency: &'static str,
    pub customer: InvoiceCustomer,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceCustomer {
    pub given_names: String,
    pub mobile_number: String,
}

/// Invoice as returned by the gateway.
///
/// Only the fields this service uses are read.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Invoice {
    pub id: String,
    pub external_id: String,
    pub status: String,
    pub amount: f64,
    pub invoice_url: Option<String>,
    pub paid_amount: Option<f64>,
    pub payment_method: Option<String>,
    pub payment_channel: Option<String>,
    pub paid_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Thin client over the invoice endpoints.
#[derive(Debug, Clone)]
pub struct XenditClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl XenditClient {
    pub fn new(http: reqwest::Client, base_url: String, secret_key: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    /// Open a hosted invoice.
    ///
    /// `POST {base}/v2/invoices`, authenticated with HTTP basic auth using
    /// the secret key as username and an empty password.
    pub async fn create_invoice(&self, request: &CreateInvoice) -> Result<Invoice, AppError> {
        let response = self
            .http
            .post(format!("{}/v2/invoices", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("invoice request failed: {e}")))?;

        Self::read_invoice(response).await
    }

    /// Fetch an invoice by gateway id.
    pub async fn get_invoice(&self, invoice_id: &str) -> Result<Invoice, AppError> {
        let response = self
            .http
            .get(format!("{}/v2/invoices/{}", self.base_url, invoice_id))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("invoice lookup failed: {e}")))?;

        Self::read_invoice(response).await
    }

    async fn read_invoice(response: reqwest::Response) -> Result<Invoice, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "gateway returned {status}: {body}"
            )));
        }

        response
            .json::<Invoice>()
            .await
            .map_err(|e| AppError::Gateway(format!("unreadable invoice response: {e}")))
    }
}

/// Compare the callback token sent by the gateway with the configured one.
///
/// Both values go through HMAC-SHA256 under the same key and the tags are
/// compared with `verify_slice`, which runs in constant time.
pub fn verify_callback_token(expected: &str, provided: &str) -> bool {
    if expected.is_empty() {
        return false;
    }

    let tag = |value: &str| -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(expected.as_bytes()).ok()?;
        mac.update(value.as_bytes());
        Some(mac)
    };

    match (tag(expected), tag(provided)) {
        (Some(expected_mac), Some(provided_mac)) => {
            let expected_tag = expected_mac.finalize().into_bytes();
            provided_mac.verify_slice(&expected_tag).is_ok()
        }
        _ => false,
    }
}
