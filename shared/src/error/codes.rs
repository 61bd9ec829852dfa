//! Unified error codes for the provenance ledger
//!
//! Error codes are organized by category:
//! - 0xxx: General / validation errors
//! - 1xxx: Ledger errors
//! - 2xxx: Truth registry errors
//! - 8xxx: Message delivery errors
//! - 9xxx: System / storage errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Represented as u16 values so logs, dead-letter records and HTTP clients
/// all see the same number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,

    // ==================== 1xxx: Ledger ====================
    /// Inbound ledger event could not be decoded
    DecodeFailed = 1001,
    /// Amount is negative, too precise or too large
    InvalidAmount = 1002,
    /// Subject does not map to a ledger entry kind
    UnknownSubject = 1003,

    // ==================== 2xxx: Truth registry ====================
    /// Content payload is not a JSON object
    InvalidContent = 2001,

    // ==================== 8xxx: Delivery ====================
    /// Publishing to the message bus failed
    DeliveryFailed = 8001,
    /// Subscribing to a subject failed or the subscription ended
    SubscribeFailed = 8002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timed out
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
}

/// Error returned when converting an unknown u16 to [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl ErrorCode {
    /// Numeric value of this code
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Default message for this code
    ///
    /// `DatabaseError` renders as the opaque `db_error` token HTTP callers
    /// match on.
    pub fn message(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "not_found",
            Self::InvalidRequest => "invalid request",
            Self::InvalidFormat => "Invalid format",
            Self::RequiredField => "Required field missing",

            Self::DecodeFailed => "Malformed ledger event",
            Self::InvalidAmount => "Invalid amount",
            Self::UnknownSubject => "Unknown ledger subject",

            Self::InvalidContent => "content must be an object",

            Self::DeliveryFailed => "Message delivery failed",
            Self::SubscribeFailed => "Subscription failed",

            Self::InternalError => "Internal server error",
            Self::DatabaseError => "db_error",
            Self::NetworkError => "Network error",
            Self::TimeoutError => "Operation timed out",
            Self::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),

            1001 => Ok(ErrorCode::DecodeFailed),
            1002 => Ok(ErrorCode::InvalidAmount),
            1003 => Ok(ErrorCode::UnknownSubject),

            2001 => Ok(ErrorCode::InvalidContent),

            8001 => Ok(ErrorCode::DeliveryFailed),
            8002 => Ok(ErrorCode::SubscribeFailed),

            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::RequiredField.code(), 7);
        assert_eq!(ErrorCode::DecodeFailed.code(), 1001);
        assert_eq!(ErrorCode::InvalidContent.code(), 2001);
        assert_eq!(ErrorCode::DeliveryFailed.code(), 8001);
        assert_eq!(ErrorCode::DatabaseError.code(), 9002);
        assert_eq!(ErrorCode::TimeoutError.code(), 9004);
    }

    #[test]
    fn test_try_from() {
        assert_eq!(ErrorCode::try_from(1002), Ok(ErrorCode::InvalidAmount));
        assert_eq!(ErrorCode::try_from(8002), Ok(ErrorCode::SubscribeFailed));
        assert_eq!(ErrorCode::try_from(0), Err(InvalidErrorCode(0)));
        assert_eq!(ErrorCode::try_from(4), Err(InvalidErrorCode(4)));
        assert_eq!(ErrorCode::try_from(10000), Err(InvalidErrorCode(10000)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::DatabaseError).unwrap();
        assert_eq!(json, "9002");

        let code: ErrorCode = serde_json::from_str("1001").unwrap();
        assert_eq!(code, ErrorCode::DecodeFailed);

        assert!(serde_json::from_str::<ErrorCode>("999").is_err());
    }

    #[test]
    fn test_database_error_message_is_opaque() {
        assert_eq!(ErrorCode::DatabaseError.message(), "db_error");
        assert_eq!(ErrorCode::NotFound.message(), "not_found");
    }
}
