//! API routes for fleet-billing

pub mod health;
pub mod payments;
pub mod subscriptions;

use axum::routing::{delete, get, post};
use axum::{Router, middleware};

use crate::auth;
use crate::error::AppError;
use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, AppError>;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Admin override gateway: bypasses the payment broker entirely
    let admin = Router::new()
        .route("/api/admin/subscriptions", post(subscriptions::assign))
        .route(
            "/api/admin/subscriptions/{id}",
            delete(subscriptions::cancel),
        )
        .route("/api/admin/audit/{user_id}", get(subscriptions::audit_log))
        .layer(middleware::from_fn(auth::require_admin));

    // Self-service: queries plus the payment-gated purchase path
    let user = Router::new()
        .route(
            "/api/subscriptions/user/{user_id}",
            get(subscriptions::list_for_user),
        )
        .route("/api/subscriptions/status", get(subscriptions::current_status))
        .route("/api/payments/create-order", post(payments::create_order))
        .route("/api/payments/verify", post(payments::verify));

    let authenticated = admin.merge(user).layer(middleware::from_fn_with_state(
        state.clone(),
        auth::auth_middleware,
    ));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(authenticated)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
