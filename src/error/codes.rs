//! Stable error codes for the billing service
//!
//! Codes are u16 values banded by domain so that clients can branch on
//! ranges without knowing every variant.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Represented as u16 for efficient serialization and cross-language
/// compatibility with the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Administrator role required
    AdminRequired = 2003,

    // ==================== 3xxx: Subscription ====================
    /// An active subscription already exists for this user
    ActiveSubscriptionExists = 3001,
    /// Subscription not found
    SubscriptionNotFound = 3002,
    /// Subscription is already cancelled or expired
    SubscriptionAlreadyTerminal = 3003,
    /// Requested status transition is not allowed
    InvalidTransition = 3004,
    /// Plan not found
    PlanNotFound = 3005,
    /// Plan is not active
    PlanInactive = 3006,

    // ==================== 5xxx: Payment ====================
    /// Payment signature verification failed
    SignatureMismatch = 5001,
    /// Payment gateway unreachable or timed out
    GatewayUnavailable = 5002,
    /// Payment order not found
    OrderNotFound = 5003,
    /// Plan cannot be purchased through self-service checkout
    PlanNotPayable = 5004,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::AdminRequired => "Administrator role is required",

            // Subscription
            ErrorCode::ActiveSubscriptionExists => {
                "User already has an active subscription; cancel it first"
            }
            ErrorCode::SubscriptionNotFound => "Subscription not found",
            ErrorCode::SubscriptionAlreadyTerminal => {
                "Subscription is already cancelled or expired"
            }
            ErrorCode::InvalidTransition => "Status transition is not allowed",
            ErrorCode::PlanNotFound => "Plan not found",
            ErrorCode::PlanInactive => "Plan is not active",

            // Payment
            ErrorCode::SignatureMismatch => "Payment verification failed",
            ErrorCode::GatewayUnavailable => "Payment gateway unavailable, please retry",
            ErrorCode::OrderNotFound => "Payment order not found",
            ErrorCode::PlanNotPayable => "Plan cannot be purchased online",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
        }
    }

    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            Self::NotFound
            | Self::SubscriptionNotFound
            | Self::PlanNotFound
            | Self::OrderNotFound => StatusCode::NOT_FOUND,

            Self::AlreadyExists
            | Self::ActiveSubscriptionExists
            | Self::SubscriptionAlreadyTerminal
            | Self::InvalidTransition => StatusCode::CONFLICT,

            Self::NotAuthenticated | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }

            Self::PermissionDenied | Self::AdminRequired => StatusCode::FORBIDDEN,

            Self::Unknown
            | Self::ValidationFailed
            | Self::InvalidRequest
            | Self::PlanInactive
            | Self::PlanNotPayable
            | Self::SignatureMismatch => StatusCode::BAD_REQUEST,

            Self::GatewayUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            Self::InternalError | Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2003 => Ok(ErrorCode::AdminRequired),

            // Subscription
            3001 => Ok(ErrorCode::ActiveSubscriptionExists),
            3002 => Ok(ErrorCode::SubscriptionNotFound),
            3003 => Ok(ErrorCode::SubscriptionAlreadyTerminal),
            3004 => Ok(ErrorCode::InvalidTransition),
            3005 => Ok(ErrorCode::PlanNotFound),
            3006 => Ok(ErrorCode::PlanInactive),

            // Payment
            5001 => Ok(ErrorCode::SignatureMismatch),
            5002 => Ok(ErrorCode::GatewayUnavailable),
            5003 => Ok(ErrorCode::OrderNotFound),
            5004 => Ok(ErrorCode::PlanNotPayable),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),

            other => Err(InvalidErrorCode(other)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Error category classification based on error code ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Authentication errors (1xxx)
    Auth,
    /// Permission errors (2xxx)
    Permission,
    /// Subscription errors (3xxx)
    Subscription,
    /// Payment errors (5xxx)
    Payment,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Auth,
            2000..3000 => Self::Permission,
            3000..4000 => Self::Subscription,
            5000..6000 => Self::Payment,
            _ => Self::System,
        }
    }
}
