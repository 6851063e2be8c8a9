//! JWT authentication for the billing API
//!
//! Token issuance belongs to the identity service; only verification lives
//! here. The middleware attaches an [`Identity`] extension; admin routes
//! additionally pass through [`require_admin`].

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorCode};
use crate::state::AppState;

/// JWT claims issued by the identity service
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Role: "user" or "admin"
    pub role: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated identity extracted from the JWT
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub role: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Middleware that extracts and verifies the JWT from the Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::new(ErrorCode::NotAuthenticated).into_response())?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::new(ErrorCode::NotAuthenticated).into_response())?;

    let validation = Validation::default();
    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        let code = match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => ErrorCode::TokenExpired,
            _ => ErrorCode::TokenInvalid,
        };
        AppError::new(code).into_response()
    })?;

    let identity = Identity {
        user_id: token_data.claims.sub,
        role: token_data.claims.role,
    };

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Gate for the admin override routes: runs after [`auth_middleware`]
pub async fn require_admin(request: Request, next: Next) -> Result<Response, Response> {
    match request.extensions().get::<Identity>() {
        Some(identity) if identity.is_admin() => Ok(next.run(request).await),
        Some(_) => Err(AppError::new(ErrorCode::AdminRequired).into_response()),
        None => Err(AppError::new(ErrorCode::NotAuthenticated).into_response()),
    }
}
