//! Signup, login and session tests.

mod common;

use axum::http::StatusCode;
use common::{create_test_server, create_test_server_with_limit, signup};
use serde_json::{Value, json};
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn signup_normalizes_phone_and_returns_token(pool: PgPool) {
    let server = create_test_server(pool, "http://127.0.0.1:9");

    let response = server
        .post("/api/auth/signup")
        .json(&json!({
            "name": "Sari",
            "phone": "0812-3456-7890",
            "password": "hunter22"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["user"]["phone"], "6281234567890");
    assert_eq!(body["user"]["role"], "customer");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn signup_rejects_taken_phone(pool: PgPool) {
    let server = create_test_server(pool, "http://127.0.0.1:9");
    signup(&server, "081234567890").await;

    // Same number in another notation
    let response = server
        .post("/api/auth/signup")
        .json(&json!({
            "name": "Other",
            "phone": "6281234567890",
            "password": "different1"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "phone_taken");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn login_and_me(pool: PgPool) {
    let server = create_test_server(pool, "http://127.0.0.1:9");
    signup(&server, "081234567890").await;

    let wrong = server
        .post("/api/auth/login")
        .json(&json!({ "phone": "081234567890", "password": "nope-nope" }))
        .await;
    wrong.assert_status(StatusCode::UNAUTHORIZED);

    let login = server
        .post("/api/auth/login")
        .json(&json!({ "phone": "6281234567890", "password": "hunter22" }))
        .await;
    login.assert_status_ok();
    let token = login.json::<Value>()["token"].as_str().unwrap().to_string();

    let me = server.get("/api/auth/me").authorization_bearer(&token).await;
    me.assert_status_ok();
    assert_eq!(me.json::<Value>()["name"], "Budi");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn protected_routes_need_a_valid_token(pool: PgPool) {
    let server = create_test_server(pool, "http://127.0.0.1:9");

    server.get("/api/auth/me").await.assert_status(StatusCode::UNAUTHORIZED);
    server
        .get("/api/orders")
        .authorization_bearer("not-a-jwt")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn login_is_rate_limited(pool: PgPool) {
    let server = create_test_server_with_limit(pool, "http://127.0.0.1:9", 3);
    let body = json!({ "phone": "081200000000", "password": "whatever1" });

    for _ in 0..3 {
        server
            .post("/api/auth/login")
            .json(&body)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    let limited = server.post("/api/auth/login").json(&body).await;
    limited.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.json::<Value>()["error"]["code"], "rate_limited");
}
