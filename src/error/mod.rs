//! Unified error system for fleet-billing
//!
//! - [`ErrorCode`]: stable numeric codes, banded by domain
//! - [`ErrorCategory`]: classification by code range
//! - [`AppError`]: error type with code, message and optional details
//! - [`ApiResponse`]: unified API response envelope
//!
//! # Error code ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Subscription errors
//! - 5xxx: Payment errors
//! - 9xxx: System errors

mod codes;
mod types;

pub use codes::{ErrorCategory, ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError};
