//! Payment order persistence
//!
//! Orders move `created -> verified` or `created -> failed` exactly once;
//! both transitions are compare-and-swap updates so gateway callbacks are
//! safe under at-least-once delivery.

use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct PaymentOrder {
    pub order_id: String,
    pub user_id: String,
    pub plan_id: i64,
    pub billing_cycle: String,
    /// Amount in minor currency units, as quoted to the gateway
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub created_at: i64,
}

pub struct NewPaymentOrder<'a> {
    pub order_id: &'a str,
    pub user_id: &'a str,
    pub plan_id: i64,
    pub billing_cycle: &'a str,
    pub amount: i64,
    pub currency: &'a str,
    pub now: i64,
}

/// Insert a freshly created order.
///
/// Returns false when the partial unique index found another outstanding
/// `created` order for the same user and plan (lost a create race).
pub async fn create(pool: &PgPool, order: &NewPaymentOrder<'_>) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO payment_orders
             (order_id, user_id, plan_id, billing_cycle, amount, currency, status, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, 'created', $7)
         ON CONFLICT (user_id, plan_id) WHERE status = 'created' DO NOTHING",
    )
    .bind(order.order_id)
    .bind(order.user_id)
    .bind(order.plan_id)
    .bind(order.billing_cycle)
    .bind(order.amount)
    .bind(order.currency)
    .bind(order.now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn find_by_order_id(
    pool: &PgPool,
    order_id: &str,
) -> Result<Option<PaymentOrder>, sqlx::Error> {
    sqlx::query_as::<_, PaymentOrder>(
        "SELECT order_id, user_id, plan_id, billing_cycle, amount, currency, status,
                payment_id, gateway_signature, created_at
         FROM payment_orders WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_optional(pool)
    .await
}

/// The user's outstanding `created` order for a plan, if one exists.
pub async fn find_pending(
    pool: &PgPool,
    user_id: &str,
    plan_id: i64,
) -> Result<Option<PaymentOrder>, sqlx::Error> {
    sqlx::query_as::<_, PaymentOrder>(
        "SELECT order_id, user_id, plan_id, billing_cycle, amount, currency, status,
                payment_id, gateway_signature, created_at
         FROM payment_orders
         WHERE user_id = $1 AND plan_id = $2 AND status = 'created'",
    )
    .bind(user_id)
    .bind(plan_id)
    .fetch_optional(pool)
    .await
}

/// CAS `created -> verified`. Returns false when the order was already
/// verified or failed by a concurrent caller.
pub async fn mark_verified(
    pool: &PgPool,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payment_orders
         SET status = 'verified', payment_id = $2, gateway_signature = $3
         WHERE order_id = $1 AND status = 'created'",
    )
    .bind(order_id)
    .bind(payment_id)
    .bind(signature)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// CAS `created -> failed`, recording the rejected signature for forensics.
pub async fn mark_failed(
    pool: &PgPool,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payment_orders
         SET status = 'failed', payment_id = $2, gateway_signature = $3
         WHERE order_id = $1 AND status = 'created'",
    )
    .bind(order_id)
    .bind(payment_id)
    .bind(signature)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
