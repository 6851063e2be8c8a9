//! Payment endpoints
//!
//! POST /api/payments/create-order : open a gateway order for a plan
//! POST /api/payments/verify       : verify a capture, grant entitlement

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::auth::Identity;
use crate::services::payments;
use crate::state::AppState;

use super::ApiResult;

#[derive(Deserialize)]
pub struct CreateOrderBody {
    pub plan_id: i64,
    pub billing_cycle: String,
}

/// POST /api/payments/create-order
pub async fn create_order(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreateOrderBody>,
) -> ApiResult<serde_json::Value> {
    let order =
        payments::create_order(&state, &identity.user_id, req.plan_id, &req.billing_cycle).await?;

    Ok(Json(serde_json::json!({
        "order_id": order.order_id,
        "amount": order.amount,
        "currency": order.currency,
        "key": order.key,
    })))
}

#[derive(Deserialize)]
pub struct VerifyBody {
    pub plan_id: i64,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// POST /api/payments/verify
pub async fn verify(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<VerifyBody>,
) -> ApiResult<serde_json::Value> {
    payments::verify_payment(
        &state,
        &identity.user_id,
        req.plan_id,
        &req.razorpay_order_id,
        &req.razorpay_payment_id,
        &req.razorpay_signature,
    )
    .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Payment verified"
    })))
}
