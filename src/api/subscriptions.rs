//! Subscription endpoints
//!
//! POST   /api/admin/subscriptions      : assign a plan (admin override)
//! DELETE /api/admin/subscriptions/{id} : cancel, soft by default
//! GET    /api/admin/audit/{user_id}    : audit trail, newest first
//! GET    /api/subscriptions/user/{id}  : full history, newest first
//! GET    /api/subscriptions/status     : caller's active entitlement

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::auth::Identity;
use crate::db::subscriptions::Subscription;
use crate::db::{audit, subscriptions};
use crate::error::{ApiResponse, AppError, ErrorCode};
use crate::models::SubscriptionSource;
use crate::services::lifecycle::{self, AssignRequest};
use crate::state::AppState;

use super::ApiResult;

#[derive(Deserialize)]
pub struct AssignBody {
    pub user_id: String,
    pub plan_id: i64,
    pub notes: Option<String>,
    /// Epoch millis; defaults to now
    pub start_date: Option<i64>,
}

/// POST /api/admin/subscriptions
pub async fn assign(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<AssignBody>,
) -> ApiResult<ApiResponse<Subscription>> {
    if req.user_id.trim().is_empty() {
        return Err(AppError::validation("user_id is required"));
    }
    if req.start_date.is_some_and(|s| s <= 0) {
        return Err(AppError::validation("start_date must be a positive epoch timestamp"));
    }

    let sub = lifecycle::assign(
        &state.pool,
        &AssignRequest {
            user_id: req.user_id.trim(),
            plan_id: req.plan_id,
            notes: req.notes.as_deref(),
            start_date: req.start_date,
            source: SubscriptionSource::AdminAssigned,
            actor: &identity.user_id,
        },
    )
    .await?;

    Ok(Json(ApiResponse::success(sub)))
}

#[derive(Deserialize)]
pub struct CancelParams {
    /// Soft cancel (status flip, row retained) unless explicitly false
    pub soft_delete: Option<bool>,
}

/// DELETE /api/admin/subscriptions/{id}
pub async fn cancel(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Query(params): Query<CancelParams>,
) -> ApiResult<serde_json::Value> {
    let soft_delete = params.soft_delete.unwrap_or(true);
    lifecycle::cancel(&state.pool, &id, soft_delete, &identity.user_id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// GET /api/subscriptions/user/{user_id}
///
/// Admins may read anyone; users only themselves. Clients partition the
/// result into current vs history by `status`.
pub async fn list_for_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(user_id): Path<String>,
) -> ApiResult<serde_json::Value> {
    if !identity.is_admin() && identity.user_id != user_id {
        return Err(AppError::new(ErrorCode::PermissionDenied));
    }

    let subs = subscriptions::list_by_user(&state.pool, &user_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Subscription list query failed");
            AppError::new(ErrorCode::InternalError)
        })?;

    Ok(Json(serde_json::json!({ "subscriptions": subs })))
}

/// GET /api/subscriptions/status
pub async fn current_status(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<serde_json::Value> {
    let status = lifecycle::current_status(&state.pool, &identity.user_id).await?;

    Ok(Json(match status {
        Some(s) => serde_json::json!({
            "subscription": s.subscription,
            "days_remaining": s.days_remaining,
        }),
        None => serde_json::json!({ "subscription": null }),
    }))
}

#[derive(Deserialize)]
pub struct AuditParams {
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

/// GET /api/admin/audit/{user_id}
pub async fn audit_log(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<AuditParams>,
) -> ApiResult<serde_json::Value> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let offset = params.offset.unwrap_or(0).max(0);

    let entries = audit::query(&state.pool, &user_id, limit, offset)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Audit query failed");
            AppError::new(ErrorCode::InternalError)
        })?;

    Ok(Json(serde_json::json!({ "entries": entries })))
}
