//! Unified error system for the provenance ledger
//!
//! - [`ErrorCode`]: Standardized error codes
//! - [`ErrorCategory`]: Classification of errors by domain (validation,
//!   storage, delivery, ...)
//! - [`AppError`]: Rich error type with codes, messages, and details
//!
//! # Error Code Ranges
//!
//! - 0xxx: General / validation errors
//! - 1xxx: Ledger errors
//! - 2xxx: Truth registry errors
//! - 8xxx: Delivery errors
//! - 9xxx: System / storage errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::required("contentId");
//! assert_eq!(err.code, ErrorCode::RequiredField);
//! assert_eq!(err.to_string(), "contentId required");
//!
//! let err = AppError::database("pool timed out");
//! assert!(err.is_retryable());
//! assert_eq!(err.public_message(), "db_error");
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult};
