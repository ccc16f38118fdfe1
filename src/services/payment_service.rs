//! Payment reconciliation for gateway callbacks.
//!
//! This module matches invoice callbacks to orders and payments, keeps the
//! two tables in step, and sends the "payment received" notifications.
//!
//! # Idempotency
//!
//! The gateway retries callbacks and may deliver them more than once or out
//! of order. Reconciliation is safe to repeat:
//! - `payments.external_id` is unique, so a callback updates the same row
//! - a `paid` payment is never downgraded by a late `EXPIRED`/`PENDING`
//! - order transitions are only applied when legal from the current status
//! - notifications go out only when this delivery moved the payment to
//!   `paid`, and are additionally guarded by the message log and the
//!   notifications unique constraint

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        order::{Order, OrderStatus, OrderType},
        payment::{InvoiceCallback, Payment, PaymentStatus, ReconcileOutcome},
        whatsapp::MessageKind,
    },
    services::{notification_service, order_service, whatsapp_service},
    state::AppState,
};

/// Response body returned to the gateway.
///
/// # Example
///
/// ```json
/// { "status": "ok", "payment_status": "paid", "order_status": "paid" }
/// ```
#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_status: Option<OrderStatus>,
}

impl CallbackAck {
    fn ignored() -> Self {
        Self {
            status: "ignored",
            payment_status: None,
            order_status: None,
        }
    }
}

/// Reconcile one callback and notify on a fresh payment.
///
/// Unknown gateway statuses are acknowledged as `ignored` so the gateway
/// stops retrying them.
pub async fn handle_callback(
    state: &AppState,
    callback: &InvoiceCallback,
    raw: serde_json::Value,
) -> Result<CallbackAck, AppError> {
    let Some(outcome) = reconcile(&state.pool, callback, raw).await? else {
        tracing::info!(
            external_id = %callback.external_id,
            status = %callback.status,
            "ignoring callback with untracked status"
        );
        return Ok(CallbackAck::ignored());
    };

    if outcome.newly_paid {
        dispatch_paid_notifications(state, outcome.order_id).await;
    }

    Ok(CallbackAck {
        status: "ok",
        payment_status: Some(outcome.payment_status),
        order_status: Some(outcome.order_status),
    })
}

/// Apply a callback to the `payments` and `orders` tables.
///
/// # Process
///
/// 1. Normalize the gateway status; untracked statuses return `None`
/// 2. Resolve the order through the payment (by `external_id`, then by
///    invoice id) or directly by the order's `external_id`
/// 3. Lock the order row, then the payment row
/// 4. Skip the update if it would downgrade a paid payment
/// 5. Upsert the payment keyed by `external_id`
/// 6. Move the order to the matching status when the transition is legal;
///    a purchase that becomes paid takes one unit of stock
/// 7. Commit
///
/// # Errors
///
/// - `NotFound`: neither a payment nor an order matches the callback
pub async fn reconcile(
    pool: &DbPool,
    callback: &InvoiceCallback,
    raw: serde_json::Value,
) -> Result<Option<ReconcileOutcome>, AppError> {
    let Some(status) = PaymentStatus::from_gateway(&callback.status) else {
        return Ok(None);
    };

    tracing::info!(
        external_id = %callback.external_id,
        invoice_id = %callback.id,
        status = ?status,
        "reconciling payment callback"
    );

    let mut tx = pool.begin().await?;

    let order_id: Option<Uuid> = sqlx::query_scalar(
        r#"
        SELECT order_id FROM payments
        WHERE external_id = $1 OR xendit_invoice_id = $2
        ORDER BY (external_id = $1) DESC
        LIMIT 1
        "#,
    )
    .bind(&callback.external_id)
    .bind(&callback.id)
    .fetch_optional(&mut *tx)
    .await?;

    let order = match order_id {
        Some(id) => sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?,
        None => sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE external_id = $1 FOR UPDATE",
        )
        .bind(&callback.external_id)
        .fetch_optional(&mut *tx)
        .await?,
    };

    let Some(order) = order else {
        tx.rollback().await?;
        tracing::warn!(external_id = %callback.external_id, "callback for unknown order");
        return Err(AppError::NotFound("Order"));
    };

    let existing = sqlx::query_as::<_, Payment>(
        r#"
        SELECT * FROM payments
        WHERE order_id = $1 AND (external_id = $2 OR xendit_invoice_id = $3)
        ORDER BY (external_id = $2) DESC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(order.id)
    .bind(&callback.external_id)
    .bind(&callback.id)
    .fetch_optional(&mut *tx)
    .await?;

    let previous = existing.as_ref().map(|p| p.status);

    if let Some(prev) = previous {
        if !prev.can_become(status) {
            tx.rollback().await?;
            tracing::info!(
                external_id = %callback.external_id,
                stored = ?prev,
                received = ?status,
                "payment already settled, callback ignored"
            );
            return Ok(Some(ReconcileOutcome {
                order_id: order.id,
                payment_status: prev,
                order_status: order.status,
                newly_paid: false,
            }));
        }
    }

    let amount = callback.amount_idr();
    if amount != order.total_amount {
        tracing::warn!(
            external_id = %callback.external_id,
            expected = order.total_amount,
            received = amount,
            "callback amount differs from order total"
        );
    }

    let paid_at = (status == PaymentStatus::Paid).then(|| callback.paid_at.unwrap_or_else(Utc::now));

    match existing {
        Some(payment) => {
            sqlx::query(
                r#"
                UPDATE payments
                SET status = $1,
                    xendit_invoice_id = COALESCE(xendit_invoice_id, $2),
                    payment_method = COALESCE($3, payment_method),
                    payment_channel = COALESCE($4, payment_channel),
                    paid_at = COALESCE(paid_at, $5),
                    raw_callback = $6,
                    updated_at = NOW()
                WHERE id = $7
                "#,
            )
            .bind(status)
            .bind(&callback.id)
            .bind(&callback.payment_method)
            .bind(&callback.payment_channel)
            .bind(paid_at)
            .bind(&raw)
            .bind(payment.id)
            .execute(&mut *tx)
            .await?;
        }
        None => {
            sqlx::query(
                r#"
                INSERT INTO payments (
                    order_id, external_id, xendit_invoice_id, amount, status,
                    payment_method, payment_channel, paid_at, raw_callback
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (external_id) DO UPDATE
                SET status = EXCLUDED.status,
                    xendit_invoice_id = COALESCE(payments.xendit_invoice_id, EXCLUDED.xendit_invoice_id),
                    payment_method = COALESCE(EXCLUDED.payment_method, payments.payment_method),
                    payment_channel = COALESCE(EXCLUDED.payment_channel, payments.payment_channel),
                    paid_at = COALESCE(payments.paid_at, EXCLUDED.paid_at),
                    raw_callback = EXCLUDED.raw_callback,
                    updated_at = NOW()
                "#,
            )
            .bind(order.id)
            .bind(&callback.external_id)
            .bind(&callback.id)
            .bind(amount)
            .bind(status)
            .bind(&callback.payment_method)
            .bind(&callback.payment_channel)
            .bind(paid_at)
            .bind(&raw)
            .execute(&mut *tx)
            .await?;
        }
    }

    let mut order_status = order.status;
    if let Some(target) = status.order_status() {
        if order.status == target {
            tracing::debug!(order_id = %order.id, "order already {}", target.as_str());
        } else if order.status.can_transition_to(target) {
            sqlx::query(
                r#"
                UPDATE orders
                SET status = $1,
                    paid_at = COALESCE(paid_at, $2),
                    updated_at = NOW()
                WHERE id = $3
                "#,
            )
            .bind(target)
            .bind(paid_at)
            .bind(order.id)
            .execute(&mut *tx)
            .await?;
            order_status = target;

            if target == OrderStatus::Paid && order.order_type == OrderType::Purchase {
                let taken = sqlx::query(
                    "UPDATE products SET stock = stock - 1, updated_at = NOW() WHERE id = $1 AND stock > 0",
                )
                .bind(order.product_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
                if taken == 0 {
                    tracing::warn!(order_id = %order.id, product_id = %order.product_id, "paid order for product without stock");
                }
            }
        } else {
            tracing::warn!(
                order_id = %order.id,
                current = order.status.as_str(),
                target = target.as_str(),
                "order status left unchanged by callback"
            );
        }
    }

    tx.commit().await?;

    Ok(Some(ReconcileOutcome {
        order_id: order.id,
        payment_status: status,
        order_status,
        newly_paid: status == PaymentStatus::Paid && previous != Some(PaymentStatus::Paid),
    }))
}

/// Send the "payment received" messages for an order.
///
/// Customer and admin WhatsApp messages go out at most once each (guarded
/// by the message log); the in-app notification is guarded by its unique
/// constraint. Every failure is logged and swallowed.
pub async fn dispatch_paid_notifications(state: &AppState, order_id: Uuid) {
    let order = match sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(&state.pool)
        .await
    {
        Ok(Some(order)) => order,
        Ok(None) => return,
        Err(e) => {
            tracing::error!(order_id = %order_id, "failed to load order for notification: {:?}", e);
            return;
        }
    };

    let title = match order_service::product_title(&state.pool, order.product_id).await {
        Ok(title) => title,
        Err(e) => {
            tracing::error!(order_id = %order.id, "failed to load product for notification: {:?}", e);
            return;
        }
    };

    let customer_message = whatsapp_service::payment_success_message(&order, &title);
    if let Err(e) = whatsapp_service::send_order_message_once(
        &state.pool,
        &state.http,
        &order.customer_phone,
        MessageKind::PaymentSuccess,
        &order,
        &customer_message,
    )
    .await
    {
        tracing::warn!(order_id = %order.id, "customer payment whatsapp not delivered: {:?}", e);
    }

    if let Some(admin_phone) = state.config.admin_whatsapp.as_deref() {
        let admin_message = whatsapp_service::new_order_paid_message(&order, &title);
        if let Err(e) = whatsapp_service::send_order_message_once(
            &state.pool,
            &state.http,
            admin_phone,
            MessageKind::NewOrderPaid,
            &order,
            &admin_message,
        )
        .await
        {
            tracing::warn!(order_id = %order.id, "admin payment whatsapp not delivered: {:?}", e);
        }
    }

    if let Err(e) = notification_service::notify_order_once(
        &state.pool,
        order.user_id,
        order.id,
        notification_service::KIND_PAYMENT_SUCCESS,
        "Pembayaran diterima",
        &format!(
            "Pembayaran untuk pesanan {} sebesar {} sudah diterima.",
            order.external_id,
            whatsapp_service::format_idr(order.total_amount)
        ),
    )
    .await
    {
        tracing::warn!(order_id = %order.id, "payment notification not stored: {:?}", e);
    }
}

/// Pull the invoice from the gateway and reconcile it.
///
/// Covers callbacks that never arrived. The caller must own the order or
/// be an admin.
pub async fn sync_from_gateway(
    state: &AppState,
    auth: &AuthContext,
    order_id: Uuid,
) -> Result<CallbackAck, AppError> {
    let order = order_service::get_order_for(&state.pool, auth, order_id).await?;
    let payment = order_service::get_payment_for_order(&state.pool, order.id).await?;

    let invoice_id = payment
        .xendit_invoice_id
        .ok_or_else(|| AppError::Conflict("Order has no gateway invoice".to_string()))?;

    let invoice = state.xendit.get_invoice(&invoice_id).await?;
    let raw = serde_json::to_value(&invoice).map_err(|e| AppError::Internal(e.to_string()))?;

    let callback = InvoiceCallback {
        id: invoice.id,
        external_id: invoice.external_id,
        status: invoice.status,
        amount: invoice.amount,
        paid_amount: invoice.paid_amount,
        payment_method: invoice.payment_method,
        payment_channel: invoice.payment_channel,
        paid_at: invoice.paid_at,
    };

    handle_callback(state, &callback, raw).await
}
