//! Payment order broker and capture verification
//!
//! Self-service purchase path: create a gateway order for a priced plan,
//! then verify the capture signature before any entitlement is granted.
//! Verification is the only way an unauthenticated "payment succeeded"
//! claim turns into a subscription.

use crate::db::payment_orders::{self, NewPaymentOrder, PaymentOrder};
use crate::db::plans;
use crate::error::{AppError, ErrorCode};
use crate::models::{PaymentOrderStatus, PlanType, SubscriptionSource};
use crate::razorpay::{self, GatewayError};
use crate::services::lifecycle::{self, AssignRequest};
use crate::services::ServiceResult;
use crate::state::AppState;
use crate::util;

/// Checkout-facing fields for the hosted payment page.
#[derive(Debug, serde::Serialize)]
pub struct CreatedOrder {
    pub order_id: String,
    /// Minor currency units
    pub amount: i64,
    pub currency: String,
    /// Publishable key id the checkout widget needs
    pub key: String,
}

impl CreatedOrder {
    fn from_row(order: PaymentOrder, key: &str) -> Self {
        Self {
            order_id: order.order_id,
            amount: order.amount,
            currency: order.currency,
            key: key.to_string(),
        }
    }
}

/// Create a payment order for a plan purchase.
///
/// Zero-price plans are not payable; they go through the admin override
/// path. An outstanding `created` order for the same user and plan is
/// returned as-is instead of opening a duplicate checkout.
pub async fn create_order(
    state: &AppState,
    user_id: &str,
    plan_id: i64,
    billing_cycle: &str,
) -> ServiceResult<CreatedOrder> {
    let cycle = PlanType::from_db(billing_cycle).ok_or_else(|| {
        AppError::validation(format!("Unknown billing cycle: {billing_cycle}"))
    })?;

    let plan = plans::find_by_id(&state.pool, plan_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::PlanNotFound))?;
    if !plan.is_active {
        return Err(AppError::new(ErrorCode::PlanInactive).into());
    }
    if plan.price <= 0 {
        return Err(AppError::new(ErrorCode::PlanNotPayable).into());
    }

    if let Some(existing) = payment_orders::find_pending(&state.pool, user_id, plan_id).await? {
        tracing::info!(
            user_id = %user_id,
            plan_id,
            order_id = %existing.order_id,
            "Returning outstanding payment order"
        );
        return Ok(CreatedOrder::from_row(existing, &state.razorpay_key_id));
    }

    // Gateway wants minor units
    let amount = plan.price * 100;
    let receipt = format!("sub_{}", uuid::Uuid::new_v4().simple());
    let order = razorpay::create_order(
        &state.http,
        &state.razorpay_key_id,
        &state.razorpay_key_secret,
        &razorpay::OrderRequest {
            amount,
            currency: &state.currency,
            receipt: &receipt,
            user_id,
            plan_id,
        },
    )
    .await
    .map_err(|e| match e {
        GatewayError::Unavailable(err) => {
            tracing::error!(error = %err, user_id = %user_id, plan_id, "Gateway order creation failed");
            AppError::new(ErrorCode::GatewayUnavailable)
        }
        GatewayError::BadResponse(msg) => {
            tracing::error!(error = %msg, user_id = %user_id, plan_id, "Unexpected gateway response");
            AppError::new(ErrorCode::GatewayUnavailable)
        }
    })?;

    let new_order = NewPaymentOrder {
        order_id: &order.order_id,
        user_id,
        plan_id,
        billing_cycle: cycle.as_db(),
        amount: order.amount,
        currency: &order.currency,
        now: util::now_millis(),
    };
    let inserted = payment_orders::create(&state.pool, &new_order).await?;
    if !inserted {
        // Lost an insert race; hand back the winner's order and let the
        // unreferenced gateway order lapse.
        if let Some(existing) = payment_orders::find_pending(&state.pool, user_id, plan_id).await? {
            return Ok(CreatedOrder::from_row(existing, &state.razorpay_key_id));
        }
        return Err(AppError::internal("Payment order insert race lost twice").into());
    }

    tracing::info!(
        user_id = %user_id,
        plan_id,
        order_id = %order.order_id,
        amount = order.amount,
        "Payment order created"
    );

    Ok(CreatedOrder {
        order_id: order.order_id,
        amount: order.amount,
        currency: order.currency,
        key: state.razorpay_key_id.clone(),
    })
}

/// Verify a claimed payment capture and, on first success, grant the
/// entitlement.
///
/// Safe under at-least-once delivery: the `created -> verified` flip is a
/// compare-and-swap and only its winner calls assign, so retries and
/// concurrent callbacks produce exactly one subscription.
pub async fn verify_payment(
    state: &AppState,
    caller_user_id: &str,
    plan_id: i64,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> ServiceResult<()> {
    let order = payment_orders::find_by_order_id(&state.pool, order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    if order.user_id != caller_user_id {
        return Err(AppError::new(ErrorCode::PermissionDenied).into());
    }
    if order.plan_id != plan_id {
        return Err(AppError::validation("Plan does not match the payment order").into());
    }

    match PaymentOrderStatus::from_db(&order.status) {
        Some(PaymentOrderStatus::Verified) => {
            // Gateway callbacks retry; a repeat verification is a no-op success.
            tracing::info!(order_id = %order_id, "Order already verified");
            return Ok(());
        }
        Some(PaymentOrderStatus::Failed) => {
            return Err(AppError::new(ErrorCode::SignatureMismatch).into());
        }
        Some(PaymentOrderStatus::Created) => {}
        None => {
            tracing::error!(order_id = %order_id, status = %order.status, "Unknown order status");
            return Err(AppError::new(ErrorCode::InternalError).into());
        }
    }

    if razorpay::verify_payment_signature(
        order_id,
        payment_id,
        signature,
        &state.razorpay_key_secret,
    )
    .is_err()
    {
        if let Err(e) =
            payment_orders::mark_failed(&state.pool, order_id, payment_id, signature).await
        {
            tracing::warn!(order_id = %order_id, error = %e, "Failed to record order failure");
        }
        tracing::warn!(
            order_id = %order_id,
            user_id = %order.user_id,
            "Payment signature mismatch"
        );
        // Generic message; no signature details leak to the client.
        return Err(AppError::new(ErrorCode::SignatureMismatch).into());
    }

    let won = payment_orders::mark_verified(&state.pool, order_id, payment_id, signature).await?;
    if !won {
        tracing::info!(order_id = %order_id, "Order verified concurrently, skipping assign");
        return Ok(());
    }

    let req = AssignRequest {
        user_id: &order.user_id,
        plan_id: order.plan_id,
        notes: Some(payment_id),
        start_date: None,
        source: SubscriptionSource::SelfPurchased,
        actor: &order.user_id,
    };
    let sub = lifecycle::assign(&state.pool, &req).await?;

    tracing::info!(
        order_id = %order_id,
        user_id = %order.user_id,
        subscription_id = %sub.id,
        "Entitlement granted after payment verification"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::subscriptions;
    use crate::services::ServiceError;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use sqlx::PgPool;

    const KEY_SECRET: &str = "test-key-secret";

    fn test_state(pool: PgPool) -> AppState {
        AppState {
            pool,
            http: reqwest::Client::new(),
            razorpay_key_id: "rzp_test_id".to_string(),
            razorpay_key_secret: KEY_SECRET.to_string(),
            currency: "INR".to_string(),
            jwt_secret: "test-jwt".to_string(),
        }
    }

    async fn seed_plan(pool: &PgPool, id: i64, price: i64) {
        sqlx::query(
            "INSERT INTO plans (id, name, plan_type, price, duration_days, features, is_active, created_at)
             VALUES ($1, $2, 'monthly', $3, 30, '{}', TRUE, $4)",
        )
        .bind(id)
        .bind(format!("plan-{id}"))
        .bind(price)
        .bind(util::now_millis())
        .execute(pool)
        .await
        .unwrap();
    }

    async fn seed_order(pool: &PgPool, order_id: &str, user_id: &str, plan_id: i64) {
        let inserted = payment_orders::create(
            pool,
            &NewPaymentOrder {
                order_id,
                user_id,
                plan_id,
                billing_cycle: "monthly",
                amount: 50_000,
                currency: "INR",
                now: util::now_millis(),
            },
        )
        .await
        .unwrap();
        assert!(inserted);
    }

    fn sign(order_id: &str, payment_id: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(KEY_SECRET.as_bytes()).unwrap();
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn app_code(err: ServiceError) -> ErrorCode {
        match err {
            ServiceError::App(e) => e.code,
            ServiceError::Db(e) => panic!("unexpected db error: {e}"),
        }
    }

    #[sqlx::test]
    async fn test_verify_twice_grants_one_subscription(pool: PgPool) {
        let state = test_state(pool);
        seed_plan(&state.pool, 1, 500).await;
        seed_order(&state.pool, "order_1", "u1", 1).await;
        let sig = sign("order_1", "pay_1");

        verify_payment(&state, "u1", 1, "order_1", "pay_1", &sig)
            .await
            .unwrap();
        // Retried callback is a no-op success
        verify_payment(&state, "u1", 1, "order_1", "pay_1", &sig)
            .await
            .unwrap();

        let subs = subscriptions::list_by_user(&state.pool, "u1").await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].status, "active");
        assert_eq!(subs[0].source, "self_purchased");

        let order = payment_orders::find_by_order_id(&state.pool, "order_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, "verified");
        assert_eq!(order.payment_id.as_deref(), Some("pay_1"));
    }

    #[sqlx::test]
    async fn test_bad_signature_fails_order_without_entitlement(pool: PgPool) {
        let state = test_state(pool);
        seed_plan(&state.pool, 1, 500).await;
        seed_order(&state.pool, "order_1", "u1", 1).await;

        let err = verify_payment(&state, "u1", 1, "order_1", "pay_1", &sign("order_x", "pay_1"))
            .await
            .unwrap_err();
        assert_eq!(app_code(err), ErrorCode::SignatureMismatch);

        let order = payment_orders::find_by_order_id(&state.pool, "order_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, "failed");
        assert!(subscriptions::list_by_user(&state.pool, "u1").await.unwrap().is_empty());

        // Failed is terminal; even the correct signature cannot revive it
        let err = verify_payment(&state, "u1", 1, "order_1", "pay_1", &sign("order_1", "pay_1"))
            .await
            .unwrap_err();
        assert_eq!(app_code(err), ErrorCode::SignatureMismatch);
    }

    #[sqlx::test]
    async fn test_verify_rejects_other_users_order(pool: PgPool) {
        let state = test_state(pool);
        seed_plan(&state.pool, 1, 500).await;
        seed_order(&state.pool, "order_1", "u1", 1).await;

        let err = verify_payment(&state, "u2", 1, "order_1", "pay_1", &sign("order_1", "pay_1"))
            .await
            .unwrap_err();
        assert_eq!(app_code(err), ErrorCode::PermissionDenied);

        // Untouched; the owner can still verify
        let order = payment_orders::find_by_order_id(&state.pool, "order_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, "created");
    }

    #[sqlx::test]
    async fn test_create_order_rejects_zero_price_plan(pool: PgPool) {
        let state = test_state(pool);
        seed_plan(&state.pool, 1, 0).await;

        let err = create_order(&state, "u1", 1, "monthly").await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::PlanNotPayable);
    }

    #[sqlx::test]
    async fn test_create_order_returns_outstanding_order(pool: PgPool) {
        let state = test_state(pool);
        seed_plan(&state.pool, 1, 500).await;
        seed_order(&state.pool, "order_1", "u1", 1).await;

        // Existing pending order short-circuits before any gateway call
        let order = create_order(&state, "u1", 1, "monthly").await.unwrap();
        assert_eq!(order.order_id, "order_1");
        assert_eq!(order.amount, 50_000);
        assert_eq!(order.key, "rzp_test_id");
    }
}
