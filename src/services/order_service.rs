//! Order service - pricing, order creation and status management.
//!
//! This service handles:
//! - Price calculation (purchase, rental, flash sale)
//! - Order reference generation
//! - Opening a gateway invoice for each new order
//! - Admin-driven status transitions
//!
//! # Atomicity Guarantees
//!
//! The payment row and the order's payment URL are written in one database
//! transaction. Status changes lock the order row (`FOR UPDATE`) so the
//! webhook and an admin cannot race each other past the transition check.

use chrono::{DateTime, Utc};
use rand::{Rng, distr::Alphanumeric};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        order::{CreateOrderRequest, Order, OrderStatus, OrderType},
        payment::{Payment, PaymentStatus},
        product::Product,
        whatsapp::MessageKind,
    },
    services::{
        notification_service,
        whatsapp_service,
        xendit::{CreateInvoice, Invoice, InvoiceCustomer},
    },
    state::AppState,
    validation,
};

/// Longest rental accepted, in hours (30 days).
pub const MAX_RENTAL_HOURS: i32 = 720;

/// Price of an order at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub unit_price: i64,
    pub total_amount: i64,
}

/// Compute the price of an order.
///
/// # Rules
///
/// - Purchase: one unit at the flash sale price when a sale is live,
///   otherwise the product price
/// - Rental: `rental_price_per_hour * rental_hours`; flash sales never
///   apply to rentals
///
/// # Errors
///
/// - `InvalidRequest`: rental of a non-rentable product, missing or out of
///   range `rental_hours`, or `rental_hours` sent for a purchase
pub fn quote(
    product: &Product,
    order_type: OrderType,
    rental_hours: Option<i32>,
    flash_sale_price: Option<i64>,
) -> Result<Quote, AppError> {
    match order_type {
        OrderType::Purchase => {
            if rental_hours.is_some() {
                return Err(AppError::invalid(
                    "rental_hours is only allowed for rentals",
                ));
            }
            let unit_price = flash_sale_price
                .filter(|p| *p > 0 && *p < product.price)
                .unwrap_or(product.price);
            Ok(Quote {
                unit_price,
                total_amount: unit_price,
            })
        }
        OrderType::Rental => {
            let hourly = product
                .rental_price_per_hour
                .ok_or_else(|| AppError::invalid("This product cannot be rented"))?;
            let hours = rental_hours
                .ok_or_else(|| AppError::invalid("rental_hours is required for rentals"))?;
            if !(1..=MAX_RENTAL_HOURS).contains(&hours) {
                return Err(AppError::invalid(format!(
                    "rental_hours must be between 1 and {MAX_RENTAL_HOURS}"
                )));
            }
            let total_amount = hourly
                .checked_mul(i64::from(hours))
                .ok_or_else(|| AppError::invalid("Order amount is too large"))?;
            Ok(Quote {
                unit_price: hourly,
                total_amount,
            })
        }
    }
}

/// Generate an order reference: `ORD-<yyyymmdd>-<8 uppercase alphanumerics>`.
///
/// The same string is sent to the gateway as the invoice `external_id`.
pub fn generate_external_id(now: DateTime<Utc>) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("ORD-{}-{}", now.format("%Y%m%d"), suffix)
}

/// Sale price of the flash sale live right now for a product, if any.
///
/// With overlapping sales the cheapest one wins.
pub async fn live_flash_sale_price(
    pool: &DbPool,
    product_id: Uuid,
) -> Result<Option<i64>, AppError> {
    let price: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT MIN(sale_price) FROM flash_sales
        WHERE product_id = $1
          AND is_active
          AND starts_at <= NOW()
          AND ends_at > NOW()
        "#,
    )
    .bind(product_id)
    .fetch_one(pool)
    .await?;

    Ok(price)
}

/// Create an order and open its invoice.
///
/// # Process
///
/// 1. Validate customer details
/// 2. Load the product; it must be active and in stock
/// 3. Price the order (flash sale aware)
/// 4. Insert the order as `pending`
/// 5. Open a gateway invoice; on failure cancel the order and return 502
/// 6. Insert the payment row and store the invoice URL on the order
///
/// # Errors
///
/// - `NotFound`: product missing or inactive
/// - `Conflict`: product out of stock
/// - `InvalidRequest`: validation or pricing failure
/// - `Gateway`: invoice could not be created
pub async fn create_order(
    state: &AppState,
    auth: &AuthContext,
    request: CreateOrderRequest,
) -> Result<Order, AppError> {
    let pool = &state.pool;

    let customer_name = validation::required_text("customer_name", &request.customer_name, 120)?;
    let customer_phone = validation::validate_phone(&request.customer_phone)?;
    let customer_email = validation::optional_email(request.customer_email.as_deref())?;

    let product = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE id = $1 AND is_active = true",
    )
    .bind(request.product_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Product"))?;

    if product.stock <= 0 {
        return Err(AppError::Conflict("Product is out of stock".to_string()));
    }

    let flash_price = match request.order_type {
        OrderType::Purchase => live_flash_sale_price(pool, product.id).await?,
        OrderType::Rental => None,
    };
    let price = quote(&product, request.order_type, request.rental_hours, flash_price)?;

    let external_id = generate_external_id(Utc::now());

    let order = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (
            external_id, user_id, product_id, order_type, rental_hours,
            unit_price, total_amount, customer_name, customer_phone, customer_email
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(&external_id)
    .bind(auth.user_id)
    .bind(product.id)
    .bind(request.order_type)
    .bind(request.rental_hours)
    .bind(price.unit_price)
    .bind(price.total_amount)
    .bind(&customer_name)
    .bind(&customer_phone)
    .bind(&customer_email)
    .fetch_one(pool)
    .await?;

    tracing::info!(order_id = %order.id, external_id = %order.external_id, amount = order.total_amount, "order created");

    let description = match (request.order_type, request.rental_hours) {
        (OrderType::Rental, Some(hours)) => format!("Sewa {} ({} jam)", product.title, hours),
        _ => product.title.clone(),
    };
    let order_page = format!(
        "{}/orders/{}",
        state.config.site_url.trim_end_matches('/'),
        order.id
    );
    let invoice_request = CreateInvoice {
        external_id: order.external_id.clone(),
        amount: order.total_amount,
        description,
        payer_email: customer_email,
        invoice_duration: state.config.invoice_duration_secs,
        success_redirect_url: format!("{order_page}?status=success"),
        failure_redirect_url: format!("{order_page}?status=failed"),
        currency: "IDR",
        customer: InvoiceCustomer {
            given_names: customer_name,
            mobile_number: format!("+{customer_phone}"),
        },
    };

    let invoice = match state.xendit.create_invoice(&invoice_request).await {
        Ok(invoice) => invoice,
        Err(e) => {
            sqlx::query(
                "UPDATE orders SET status = 'cancelled', updated_at = NOW() WHERE id = $1",
            )
            .bind(order.id)
            .execute(pool)
            .await?;
            tracing::error!(order_id = %order.id, "invoice creation failed, order cancelled");
            return Err(e);
        }
    };

    store_invoice(pool, &order, &invoice).await
}

/// Record an opened invoice: upsert the payment row and set the order's
/// `payment_url`, in one transaction.
///
/// A callback can land before this runs and create the payment row first;
/// its status is kept and only the invoice fields are filled in.
pub async fn store_invoice(
    pool: &DbPool,
    order: &Order,
    invoice: &Invoice,
) -> Result<Order, AppError> {
    let payment_status = PaymentStatus::from_gateway(&invoice.status).unwrap_or(PaymentStatus::Pending);

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO payments (order_id, external_id, xendit_invoice_id, amount, status, invoice_url)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (external_id) DO UPDATE
        SET invoice_url = EXCLUDED.invoice_url,
            xendit_invoice_id = COALESCE(payments.xendit_invoice_id, EXCLUDED.xendit_invoice_id),
            updated_at = NOW()
        "#,
    )
    .bind(order.id)
    .bind(&order.external_id)
    .bind(&invoice.id)
    .bind(order.total_amount)
    .bind(payment_status)
    .bind(&invoice.invoice_url)
    .execute(&mut *tx)
    .await?;

    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET payment_url = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(&invoice.invoice_url)
    .bind(order.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(order)
}

/// Load an order visible to the caller: their own, or any for admins.
///
/// Other users' orders are reported as not found.
pub async fn get_order_for(
    pool: &DbPool,
    auth: &AuthContext,
    order_id: Uuid,
) -> Result<Order, AppError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(pool)
        .await?
        .filter(|o| auth.is_admin() || o.user_id == auth.user_id)
        .ok_or(AppError::NotFound("Order"))?;

    Ok(order)
}

/// Payment row of an order.
pub async fn get_payment_for_order(pool: &DbPool, order_id: Uuid) -> Result<Payment, AppError> {
    sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE order_id = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(order_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Payment"))
}

/// Title of a product, for message templates.
pub async fn product_title(pool: &DbPool, product_id: Uuid) -> Result<String, AppError> {
    let title: Option<String> = sqlx::query_scalar("SELECT title FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(pool)
        .await?;
    Ok(title.unwrap_or_else(|| "produk".to_string()))
}

/// Admin status change.
///
/// Only `processing`, `completed` and `cancelled` can be set by hand;
/// `paid` and `expired` come from the payment gateway.
///
/// # Errors
///
/// - `InvalidRequest`: target status is gateway-driven
/// - `NotFound`: order does not exist
/// - `Conflict`: order already finished, or transition not allowed from
///   the current status
pub async fn update_status(
    state: &AppState,
    order_id: Uuid,
    next: OrderStatus,
) -> Result<Order, AppError> {
    if !matches!(
        next,
        OrderStatus::Processing | OrderStatus::Completed | OrderStatus::Cancelled
    ) {
        return Err(AppError::invalid(format!(
            "Status '{}' is set by the payment gateway",
            next.as_str()
        )));
    }

    let mut tx = state.pool.begin().await?;

    let current: OrderStatus =
        sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Order"))?;

    if current.is_terminal() {
        tx.rollback().await?;
        return Err(AppError::Conflict(format!(
            "Order is already {}",
            current.as_str()
        )));
    }

    if !current.can_transition_to(next) {
        tx.rollback().await?;
        return Err(AppError::Conflict(format!(
            "Cannot change order from '{}' to '{}'",
            current.as_str(),
            next.as_str()
        )));
    }

    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(next)
    .bind(order_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(order_id = %order.id, from = current.as_str(), to = next.as_str(), "order status changed");

    if next == OrderStatus::Completed {
        dispatch_completed_notifications(state, &order).await;
    }

    Ok(order)
}

/// Tell the customer their order is complete.
///
/// Failures are logged and swallowed.
async fn dispatch_completed_notifications(state: &AppState, order: &Order) {
    let title = match product_title(&state.pool, order.product_id).await {
        Ok(title) => title,
        Err(e) => {
            tracing::error!(order_id = %order.id, "failed to load product for notification: {:?}", e);
            return;
        }
    };

    let message = whatsapp_service::order_completed_message(order, &title);
    if let Err(e) = whatsapp_service::send_order_message_once(
        &state.pool,
        &state.http,
        &order.customer_phone,
        MessageKind::OrderCompleted,
        order,
        &message,
    )
    .await
    {
        tracing::warn!(order_id = %order.id, "completion whatsapp not delivered: {:?}", e);
    }

    if let Err(e) = notification_service::notify_order_once(
        &state.pool,
        order.user_id,
        order.id,
        notification_service::KIND_ORDER_COMPLETED,
        "Pesanan selesai",
        &format!("Pesanan {} sudah selesai.", order.external_id),
    )
    .await
    {
        tracing::warn!(order_id = %order.id, "completion notification not stored: {:?}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::product::ProductType;

    fn product(price: i64, hourly: Option<i64>) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            title: "Mythic account".into(),
            description: String::new(),
            game: "Mobile Legends".into(),
            product_type: ProductType::Account,
            price,
            rental_price_per_hour: hourly,
            stock: 1,
            images: serde_json::json!([]),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn purchase_uses_product_price() {
        let q = quote(&product(150_000, None), OrderType::Purchase, None, None).unwrap();
        assert_eq!(q, Quote { unit_price: 150_000, total_amount: 150_000 });
    }

    #[test]
    fn purchase_uses_live_flash_sale_price() {
        let q = quote(&product(150_000, None), OrderType::Purchase, None, Some(99_000)).unwrap();
        assert_eq!(q.total_amount, 99_000);
    }

    #[test]
    fn flash_price_above_list_price_is_ignored() {
        let q = quote(&product(150_000, None), OrderType::Purchase, None, Some(200_000)).unwrap();
        assert_eq!(q.total_amount, 150_000);
    }

    #[test]
    fn rental_multiplies_hourly_price() {
        let q = quote(&product(150_000, Some(10_000)), OrderType::Rental, Some(6), Some(1)).unwrap();
        assert_eq!(q, Quote { unit_price: 10_000, total_amount: 60_000 });
    }

    #[test]
    fn rental_requires_rentable_product_and_hours() {
        assert!(quote(&product(150_000, None), OrderType::Rental, Some(2), None).is_err());
        assert!(quote(&product(150_000, Some(10_000)), OrderType::Rental, None, None).is_err());
        assert!(quote(&product(150_000, Some(10_000)), OrderType::Rental, Some(0), None).is_err());
        assert!(
            quote(&product(150_000, Some(10_000)), OrderType::Rental, Some(MAX_RENTAL_HOURS + 1), None)
                .is_err()
        );
    }

    #[test]
    fn purchase_rejects_rental_hours() {
        assert!(quote(&product(150_000, Some(10_000)), OrderType::Purchase, Some(3), None).is_err());
    }

    #[test]
    fn external_id_has_date_and_suffix() {
        let now = "2025-03-09T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let id = generate_external_id(now);

        assert!(id.starts_with("ORD-20250309-"));
        let suffix = id.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert_ne!(id, generate_external_id(now));
    }
}
