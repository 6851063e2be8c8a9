//! Service layer: entitlement lifecycle and payment brokering
//!
//! `ServiceError` bridges the gap between DB-layer errors (`sqlx::Error`,
//! `BoxError`) and the API-layer error (`AppError`). It enables `?`
//! propagation without manual `.map_err(...)` boilerplate in every handler.

pub mod lifecycle;
pub mod payments;

use axum::response::IntoResponse;

use crate::error::{AppError, ErrorCode};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Service-layer error with only two variants.
///
/// - `Db`: database/infrastructure errors (auto-logged, mapped to InternalError)
/// - `App`: business-rule errors (transparent pass-through to client)
#[derive(Debug)]
pub enum ServiceError {
    /// Database or infrastructure error (sqlx, serde, etc.)
    Db(BoxError),
    /// Business-rule error (already an AppError with the correct ErrorCode)
    App(AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;
