//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,

            // 503 Service Unavailable (bus unreachable, client can retry)
            Self::NetworkError => StatusCode::SERVICE_UNAVAILABLE,

            // store timeouts are store failures to HTTP callers
            Self::InternalError
            | Self::DatabaseError
            | Self::TimeoutError
            | Self::ConfigError
            | Self::DeliveryFailed
            | Self::SubscribeFailed => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
