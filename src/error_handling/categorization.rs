//! Error categorization and retry strategy.
//!
//! This module maps errors onto `ErrorType` categories and configures the
//! backoff used when a category is transient.

use std::time::Duration;

use reqwest::StatusCode;
use tokio_retry::strategy::ExponentialBackoff;

use super::types::{Error, ErrorType, NetworkError};
use crate::config::RetryPolicy;

/// Creates an exponential backoff retry strategy.
///
/// Returns a retry strategy configured with:
/// - Exponential base: `policy.base_ms` milliseconds
/// - Multiplier: `policy.factor`
/// - Maximum delay: `policy.max_delay`
/// - Maximum attempts: `policy.max_attempts` retries after the first failure
pub fn get_retry_strategy(policy: &RetryPolicy) -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(policy.base_ms)
        .factor(policy.factor)
        .max_delay(policy.max_delay)
        .take(policy.max_attempts)
}

/// Categorizes an HTTP status code returned by the service.
pub fn categorize_status(status: StatusCode) -> ErrorType {
    match status.as_u16() {
        401 => ErrorType::HttpRequestUnauthorized,
        403 => ErrorType::HttpRequestForbidden,
        404 => ErrorType::HttpRequestNotFound,
        429 => ErrorType::HttpRequestTooManyRequests,
        _ if status.is_server_error() => ErrorType::HttpRequestServerError,
        _ if status.is_client_error() => ErrorType::HttpRequestClientError,
        _ => ErrorType::HttpRequestOtherError,
    }
}

/// Categorizes a `reqwest::Error` into an `ErrorType`.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> ErrorType {
    if let Some(status) = error.status() {
        return categorize_status(status);
    }

    if error.is_builder() {
        ErrorType::HttpRequestBuilderError
    } else if error.is_redirect() {
        ErrorType::HttpRequestRedirectError
    } else if error.is_timeout() {
        ErrorType::HttpRequestTimeoutError
    } else if error.is_connect() {
        ErrorType::HttpRequestConnectError
    } else if error.is_request() {
        ErrorType::HttpRequestRequestError
    } else if error.is_body() {
        ErrorType::HttpRequestBodyError
    } else if error.is_decode() {
        ErrorType::HttpRequestDecodeError
    } else {
        ErrorType::HttpRequestOtherError
    }
}

impl Error {
    /// The category of this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            Error::Authentication(_) => ErrorType::AuthenticationError,
            Error::Network(NetworkError::Http(e)) => categorize_reqwest_error(e),
            Error::Network(NetworkError::Status(status)) => categorize_status(*status),
            Error::Network(NetworkError::WebSocket(_)) => ErrorType::WebSocketError,
            Error::Network(NetworkError::Closed) => ErrorType::WebSocketClosed,
            Error::MalformedResponse(_) => ErrorType::MalformedResponseError,
            Error::Rejected { status, .. } => StatusCode::from_u16(*status)
                .map(categorize_status)
                .unwrap_or(ErrorType::HttpRequestClientError),
            Error::InvalidArgument(_) => ErrorType::InvalidArgumentError,
            Error::Cancelled => ErrorType::Cancelled,
            Error::Initialization(_) => ErrorType::InitializationError,
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retriable(&self) -> bool {
        self.error_type().is_transient()
    }
}
