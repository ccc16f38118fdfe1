//! Game marketplace API.
//!
//! REST backend for a storefront selling and renting game accounts and
//! game services. Orders are paid through hosted gateway invoices; gateway
//! callbacks reconcile payments and orders and trigger WhatsApp and in-app
//! notifications.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: bcrypt passwords, HS256 bearer tokens
//! - **Payments**: Xendit invoices + callback token verification
//! - **Messaging**: HTTP WhatsApp providers with per-message logging
//! - **Format**: JSON requests/responses

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod validation;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{
        admin, auth, banners, flash_sales, health, notifications, orders, payments, products,
        reviews, whatsapp,
    },
    middleware::{
        auth::{auth_middleware, require_admin},
        rate_limit::rate_limit_middleware,
    },
    state::AppState,
};

/// Build the application router.
///
/// # Route Groups
///
/// - Public: health, catalog, banners, flash sales, payment callback
/// - Rate limited: signup, login, order creation
/// - Authenticated: profile, orders, reviews, notifications
/// - Admin: catalog management, order management, WhatsApp, stats
pub fn create_router(state: AppState) -> Router {
    let rate_limited = || axum_middleware::from_fn_with_state(state.clone(), rate_limit_middleware);
    let authenticated = || axum_middleware::from_fn_with_state(state.clone(), auth_middleware);

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/products", get(products::list_products))
        .route("/api/products/{id}", get(products::get_product))
        .route("/api/products/{id}/reviews", get(reviews::product_reviews))
        .route("/api/flash-sales", get(flash_sales::list_live))
        .route("/api/banners", get(banners::list_active))
        .route(
            "/api/payments/xendit/webhook",
            post(payments::xendit_webhook),
        );

    let session_routes = Router::new()
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route_layer(rate_limited());

    let user_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route(
            "/api/orders",
            post(orders::create_order)
                .layer(rate_limited())
                .get(orders::list_my_orders),
        )
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/api/orders/{id}/payment", get(orders::get_order_payment))
        .route(
            "/api/orders/{id}/payment/sync",
            post(orders::sync_payment),
        )
        .route("/api/reviews", post(reviews::create_review))
        .route(
            "/api/notifications",
            get(notifications::list_notifications),
        )
        .route(
            "/api/notifications/read-all",
            post(notifications::mark_all_read),
        )
        .route(
            "/api/notifications/{id}/read",
            post(notifications::mark_read),
        )
        .route_layer(authenticated());

    let admin_routes = Router::new()
        .route("/api/admin/stats", get(admin::stats))
        // Catalog
        .route("/api/admin/products", post(products::create_product))
        .route(
            "/api/admin/products/{id}",
            put(products::update_product).delete(products::delete_product),
        )
        .route(
            "/api/admin/flash-sales",
            get(flash_sales::list_all).post(flash_sales::create_flash_sale),
        )
        .route(
            "/api/admin/flash-sales/{id}",
            put(flash_sales::update_flash_sale).delete(flash_sales::delete_flash_sale),
        )
        .route(
            "/api/admin/banners",
            get(banners::list_all).post(banners::create_banner),
        )
        .route(
            "/api/admin/banners/{id}",
            put(banners::update_banner).delete(banners::delete_banner),
        )
        .route(
            "/api/admin/reviews/{id}",
            patch(reviews::set_visibility).delete(reviews::delete_review),
        )
        // Orders
        .route("/api/admin/orders", get(orders::admin_list_orders))
        .route(
            "/api/admin/orders/{id}/status",
            patch(orders::admin_update_status),
        )
        // WhatsApp
        .route(
            "/api/admin/whatsapp/providers",
            get(whatsapp::list_providers).post(whatsapp::create_provider),
        )
        .route(
            "/api/admin/whatsapp/providers/{id}",
            put(whatsapp::update_provider).delete(whatsapp::delete_provider),
        )
        .route(
            "/api/admin/whatsapp/providers/{id}/keys",
            get(whatsapp::list_keys).post(whatsapp::add_key),
        )
        .route(
            "/api/admin/whatsapp/keys/{id}",
            delete(whatsapp::deactivate_key),
        )
        .route("/api/admin/whatsapp/logs", get(whatsapp::list_logs))
        .route("/api/admin/whatsapp/test", post(whatsapp::send_test))
        // Layers run bottom-up: authenticate first, then check the role
        .route_layer(axum_middleware::from_fn(require_admin))
        .route_layer(authenticated());

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
