//! Shared helpers for the HTTP integration tests.
//!
//! Tests use `#[sqlx::test]`, which creates an isolated database per test,
//! applies `migrations/` and then the requested fixtures. They need a
//! Postgres server reachable through `DATABASE_URL`.

#![allow(dead_code)]

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use httpmock::prelude::*;
use game_marketplace_api::{config::Config, create_router, state::AppState};
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

pub const CALLBACK_TOKEN: &str = "test-callback-token";
pub const MYTHIC_ACCOUNT: &str = "11111111-1111-1111-1111-111111111111";
pub const BOOST_SERVICE: &str = "22222222-2222-2222-2222-222222222222";
pub const SOLD_OUT: &str = "33333333-3333-3333-3333-333333333333";
pub const RETIRED: &str = "44444444-4444-4444-4444-444444444444";

/// Configuration pointing the payment gateway at `xendit_url`.
pub fn test_config(xendit_url: &str, rate_limit: u32) -> Config {
    Config::from_pairs([
        ("DATABASE_URL", "postgres://unused"),
        ("JWT_SECRET", "integration-test-secret"),
        ("XENDIT_SECRET_KEY", "xnd_test_key"),
        ("XENDIT_CALLBACK_TOKEN", CALLBACK_TOKEN),
        ("XENDIT_API_URL", xendit_url),
        ("SITE_URL", "http://shop.test"),
        ("HTTP_TIMEOUT_SECS", "2"),
        ("RATE_LIMIT_MAX_REQUESTS", &rate_limit.to_string()),
    ])
    .expect("test config should parse")
}

/// Test server with a generous rate limit.
pub fn create_test_server(pool: PgPool, xendit_url: &str) -> TestServer {
    create_test_server_with_limit(pool, xendit_url, 1_000)
}

pub fn create_test_server_with_limit(pool: PgPool, xendit_url: &str, limit: u32) -> TestServer {
    let state = AppState::new(pool, test_config(xendit_url, limit)).expect("state should build");
    TestServer::new(create_router(state)).expect("Failed to create test server")
}

/// Sign up a customer and return `(token, user_id)`.
pub async fn signup(server: &TestServer, phone: &str) -> (String, Uuid) {
    let response = server
        .post("/api/auth/signup")
        .json(&json!({
            "name": "Budi",
            "phone": phone,
            "password": "hunter22"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    let token = body["token"].as_str().expect("token").to_string();
    let user_id = body["user"]["id"].as_str().expect("user id").parse().expect("uuid");
    (token, user_id)
}

/// Sign up a user and promote them to admin.
pub async fn admin(server: &TestServer, pool: &PgPool, phone: &str) -> String {
    let (token, user_id) = signup(server, phone).await;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .expect("promote admin");
    token
}

/// Register a WhatsApp provider whose send endpoint is `url`.
pub async fn register_provider(pool: &PgPool, url: &str) -> Uuid {
    let provider_id: Uuid = sqlx::query_scalar(
        "INSERT INTO whatsapp_providers (name, base_url, priority) VALUES ('mock', $1, 0) RETURNING id",
    )
    .bind(url)
    .fetch_one(pool)
    .await
    .expect("insert provider");

    sqlx::query("INSERT INTO whatsapp_api_keys (provider_id, api_key) VALUES ($1, 'wa-key')")
        .bind(provider_id)
        .execute(pool)
        .await
        .expect("insert key");

    provider_id
}

pub fn callback_token_header(token: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-callback-token"),
        HeaderValue::from_static(token),
    )
}

/// Invoice callback body as the gateway sends it.
pub fn callback_body(invoice_id: &str, external_id: &str, status: &str, amount: i64) -> Value {
    json!({
        "id": invoice_id,
        "external_id": external_id,
        "status": status,
        "amount": amount,
        "paid_amount": amount,
        "payment_method": "EWALLET",
        "payment_channel": "OVO",
        "paid_at": "2025-01-01T10:00:00.000Z"
    })
}

/// Place a purchase of [`MYTHIC_ACCOUNT`] against a gateway that opens
/// invoice `inv_paid`, and return the order JSON.
pub async fn place_order(server: &TestServer, xendit: &MockServer, token: &str) -> Value {
    xendit
        .mock_async(|when, then| {
            when.method(POST).path("/v2/invoices");
            then.status(200).json_body(json!({
                "id": "inv_paid",
                "external_id": "x",
                "status": "PENDING",
                "amount": 150000,
                "invoice_url": "https://checkout.xendit.co/web/inv_paid"
            }));
        })
        .await;

    let response = server
        .post("/api/orders")
        .authorization_bearer(token)
        .json(&json!({
            "product_id": MYTHIC_ACCOUNT,
            "order_type": "purchase",
            "customer_name": "Budi",
            "customer_phone": "081234567890"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

/// Deliver an authenticated invoice callback.
pub async fn deliver_callback(server: &TestServer, body: &Value) -> axum_test::TestResponse {
    let (name, value) = callback_token_header(CALLBACK_TOKEN);
    server
        .post("/api/payments/xendit/webhook")
        .add_header(name, value)
        .json(body)
        .await
}
