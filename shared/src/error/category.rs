//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Validation-style categories are the caller's fault and never retried.
/// `Delivery` and `Storage` are transient: a consumer redelivers, an HTTP
/// caller sees a generic server error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General / validation errors (0xxx)
    Validation,
    /// Ledger payload errors (1xxx)
    Ledger,
    /// Truth registry errors (2xxx)
    Registry,
    /// Message bus errors (8xxx)
    Delivery,
    /// Storage and system errors (9xxx)
    Storage,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::Validation,
            1000..2000 => Self::Ledger,
            2000..3000 => Self::Registry,
            8000..9000 => Self::Delivery,
            _ => Self::Storage,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Ledger => "ledger",
            Self::Registry => "registry",
            Self::Delivery => "delivery",
            Self::Storage => "storage",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }

    /// Whether an operation failing with this code may succeed if repeated
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError
                | Self::NetworkError
                | Self::TimeoutError
                | Self::DeliveryFailed
                | Self::SubscribeFailed
        )
    }
}
