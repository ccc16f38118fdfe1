//! Order creation and admin order management tests.

mod common;

use axum::http::StatusCode;
use common::{
    BOOST_SERVICE, MYTHIC_ACCOUNT, RETIRED, SOLD_OUT, admin, callback_body, create_test_server,
    deliver_callback, place_order, register_provider, signup,
};
use httpmock::prelude::*;
use serde_json::{Value, json};
use sqlx::PgPool;

fn order_body(product_id: &str) -> Value {
    json!({
        "product_id": product_id,
        "order_type": "purchase",
        "customer_name": "Budi",
        "customer_phone": "081234567890"
    })
}

#[sqlx::test(migrations = "./migrations", fixtures(path = "fixtures", scripts("products")))]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn create_order_opens_invoice(pool: PgPool) {
    let xendit = MockServer::start_async().await;
    let invoice = xendit
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v2/invoices")
                .json_body_partial(r#"{ "amount": 150000, "currency": "IDR" }"#);
            then.status(200).json_body(json!({
                "id": "inv_001",
                "external_id": "ignored-by-client",
                "status": "PENDING",
                "amount": 150000,
                "invoice_url": "https://checkout.xendit.co/web/inv_001"
            }));
        })
        .await;

    let server = create_test_server(pool.clone(), &xendit.base_url());
    let (token, _) = signup(&server, "081234567890").await;

    let response = server
        .post("/api/orders")
        .authorization_bearer(&token)
        .json(&order_body(MYTHIC_ACCOUNT))
        .await;

    response.assert_status(StatusCode::CREATED);
    invoice.assert_async().await;

    let order: Value = response.json();
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_amount"], 150000);
    assert_eq!(order["payment_url"], "https://checkout.xendit.co/web/inv_001");
    assert!(order["external_id"].as_str().unwrap().starts_with("ORD-"));

    let order_id = order["id"].as_str().unwrap();
    let payment = server
        .get(&format!("/api/orders/{order_id}/payment"))
        .authorization_bearer(&token)
        .await;
    payment.assert_status_ok();
    let payment: Value = payment.json();
    assert_eq!(payment["status"], "pending");
    assert_eq!(payment["xendit_invoice_id"], "inv_001");
}

#[sqlx::test(migrations = "./migrations", fixtures(path = "fixtures", scripts("products")))]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn flash_sale_price_applies_to_purchases(pool: PgPool) {
    sqlx::query(
        r#"
        INSERT INTO flash_sales (product_id, sale_price, starts_at, ends_at)
        VALUES ($1::uuid, 99000, NOW() - INTERVAL '1 hour', NOW() + INTERVAL '1 hour')
        "#,
    )
    .bind(MYTHIC_ACCOUNT)
    .execute(&pool)
    .await
    .unwrap();

    let xendit = MockServer::start_async().await;
    let invoice = xendit
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v2/invoices")
                .json_body_partial(r#"{ "amount": 99000 }"#);
            then.status(200).json_body(json!({
                "id": "inv_sale",
                "external_id": "x",
                "status": "PENDING",
                "amount": 99000,
                "invoice_url": "https://checkout.xendit.co/web/inv_sale"
            }));
        })
        .await;

    let server = create_test_server(pool, &xendit.base_url());
    let (token, _) = signup(&server, "081234567890").await;

    let response = server
        .post("/api/orders")
        .authorization_bearer(&token)
        .json(&order_body(MYTHIC_ACCOUNT))
        .await;

    response.assert_status(StatusCode::CREATED);
    invoice.assert_async().await;
    assert_eq!(response.json::<Value>()["total_amount"], 99000);
}

#[sqlx::test(migrations = "./migrations", fixtures(path = "fixtures", scripts("products")))]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn create_order_rejects_unavailable_products(pool: PgPool) {
    let server = create_test_server(pool, "http://127.0.0.1:9");
    let (token, _) = signup(&server, "081234567890").await;

    server
        .post("/api/orders")
        .authorization_bearer(&token)
        .json(&order_body(SOLD_OUT))
        .await
        .assert_status(StatusCode::CONFLICT);

    server
        .post("/api/orders")
        .authorization_bearer(&token)
        .json(&order_body(RETIRED))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // Services cannot be rented
    server
        .post("/api/orders")
        .authorization_bearer(&token)
        .json(&json!({
            "product_id": BOOST_SERVICE,
            "order_type": "rental",
            "rental_hours": 4,
            "customer_name": "Budi",
            "customer_phone": "081234567890"
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations", fixtures(path = "fixtures", scripts("products")))]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn gateway_failure_cancels_order(pool: PgPool) {
    let xendit = MockServer::start_async().await;
    xendit
        .mock_async(|when, then| {
            when.method(POST).path("/v2/invoices");
            then.status(500).body("boom");
        })
        .await;

    let server = create_test_server(pool.clone(), &xendit.base_url());
    let (token, user_id) = signup(&server, "081234567890").await;

    let response = server
        .post("/api/orders")
        .authorization_bearer(&token)
        .json(&order_body(MYTHIC_ACCOUNT))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);

    let status: String =
        sqlx::query_scalar("SELECT status::text FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, "cancelled");
}

#[sqlx::test(migrations = "./migrations", fixtures(path = "fixtures", scripts("products")))]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn customers_cannot_see_other_orders(pool: PgPool) {
    let xendit = MockServer::start_async().await;
    xendit
        .mock_async(|when, then| {
            when.method(POST).path("/v2/invoices");
            then.status(200).json_body(json!({
                "id": "inv_002",
                "external_id": "x",
                "status": "PENDING",
                "amount": 150000,
                "invoice_url": "https://checkout.xendit.co/web/inv_002"
            }));
        })
        .await;

    let server = create_test_server(pool, &xendit.base_url());
    let (owner, _) = signup(&server, "081234567890").await;
    let (stranger, _) = signup(&server, "081298765432").await;

    let order: Value = server
        .post("/api/orders")
        .authorization_bearer(&owner)
        .json(&order_body(MYTHIC_ACCOUNT))
        .await
        .json();
    let order_id = order["id"].as_str().unwrap();

    server
        .get(&format!("/api/orders/{order_id}"))
        .authorization_bearer(&stranger)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let mine: Vec<Value> = server
        .get("/api/orders")
        .authorization_bearer(&owner)
        .await
        .json();
    assert_eq!(mine.len(), 1);
}

#[sqlx::test(migrations = "./migrations", fixtures(path = "fixtures", scripts("products")))]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn admin_routes_require_admin_role(pool: PgPool) {
    let server = create_test_server(pool.clone(), "http://127.0.0.1:9");
    let (customer, _) = signup(&server, "081234567890").await;

    let forbidden = server.get("/api/admin/orders").authorization_bearer(&customer).await;
    forbidden.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(forbidden.json::<Value>()["error"]["code"], "forbidden");

    let admin_token = admin(&server, &pool, "081111111111").await;
    server
        .get("/api/admin/orders")
        .authorization_bearer(&admin_token)
        .await
        .assert_status_ok();

    let stats = server.get("/api/admin/stats").authorization_bearer(&admin_token).await;
    stats.assert_status_ok();
    assert_eq!(stats.json::<Value>()["active_products"], 3);
}

#[sqlx::test(migrations = "./migrations", fixtures(path = "fixtures", scripts("products")))]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn admin_status_changes_follow_lifecycle(pool: PgPool) {
    let xendit = MockServer::start_async().await;
    let whatsapp = MockServer::start_async().await;
    let send = whatsapp
        .mock_async(|when, then| {
            when.method(POST).path("/send");
            then.status(200).json_body(json!({ "status": true }));
        })
        .await;
    register_provider(&pool, &whatsapp.url("/send")).await;

    let server = create_test_server(pool.clone(), &xendit.base_url());
    let (token, _) = signup(&server, "081234567890").await;
    let admin_token = admin(&server, &pool, "081111111111").await;
    let order = place_order(&server, &xendit, &token).await;
    let order_id = order["id"].as_str().unwrap();
    let status_path = format!("/api/admin/orders/{order_id}/status");

    // pending cannot jump to completed
    server
        .patch(&status_path)
        .authorization_bearer(&admin_token)
        .json(&json!({ "status": "completed" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    // paid is reserved for the gateway
    server
        .patch(&status_path)
        .authorization_bearer(&admin_token)
        .json(&json!({ "status": "paid" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    deliver_callback(
        &server,
        &callback_body("inv_paid", order["external_id"].as_str().unwrap(), "PAID", 150000),
    )
    .await
    .assert_status_ok();

    let completed = server
        .patch(&status_path)
        .authorization_bearer(&admin_token)
        .json(&json!({ "status": "completed" }))
        .await;
    completed.assert_status_ok();
    assert_eq!(completed.json::<Value>()["status"], "completed");

    server
        .patch(&status_path)
        .authorization_bearer(&admin_token)
        .json(&json!({ "status": "completed" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let completion_messages: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM whatsapp_message_logs WHERE message_type = 'order_completed' AND status = 'sent'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(completion_messages, 1);

    let completion_notifications: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE kind = 'order_completed'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(completion_notifications, 1);

    // payment_success + order_completed
    assert_eq!(send.hits_async().await, 2);
}

#[sqlx::test(migrations = "./migrations", fixtures(path = "fixtures", scripts("products")))]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn payment_sync_reconciles_from_gateway(pool: PgPool) {
    let xendit = MockServer::start_async().await;
    let server = create_test_server(pool.clone(), &xendit.base_url());
    let (token, _) = signup(&server, "081234567890").await;
    let order = place_order(&server, &xendit, &token).await;
    let order_id = order["id"].as_str().unwrap();
    let external_id = order["external_id"].as_str().unwrap();

    let lookup = xendit
        .mock_async(|when, then| {
            when.method(GET).path("/v2/invoices/inv_paid");
            then.status(200).json_body(json!({
                "id": "inv_paid",
                "external_id": external_id,
                "status": "SETTLED",
                "amount": 150000,
                "paid_amount": 150000,
                "payment_method": "BANK_TRANSFER",
                "payment_channel": "BCA",
                "paid_at": "2025-01-01T10:00:00.000Z"
            }));
        })
        .await;

    let response = server
        .post(&format!("/api/orders/{order_id}/payment/sync"))
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    lookup.assert_async().await;

    let ack: Value = response.json();
    assert_eq!(ack["payment_status"], "paid");
    assert_eq!(ack["order_status"], "paid");

    let payment: Value = server
        .get(&format!("/api/orders/{order_id}/payment"))
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(payment["status"], "paid");
    assert_eq!(payment["payment_channel"], "BCA");
}
