//! Error type definitions.
//!
//! This module defines all error types surfaced by the client, plus the
//! `ErrorType` categories used for retry decisions and log messages.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use reqwest::StatusCode;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Convenience alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// Error building the runtime behind the blocking client.
    #[error("Runtime initialization error: {0}")]
    RuntimeError(#[from] std::io::Error),
}

/// Transport-level failures reaching the service.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// The HTTP client failed (DNS, connect, TLS, timeout, body).
    #[error(transparent)]
    Http(#[from] ReqwestError),

    /// The service answered with a transient status (5xx, 429).
    #[error("service unavailable (HTTP {0})")]
    Status(StatusCode),

    /// The push channel failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// The push channel was closed by the service.
    #[error("push channel closed by the service")]
    Closed,
}

/// Errors returned by the requestrepo client.
#[derive(Error, Debug)]
pub enum Error {
    /// The token is missing, malformed, expired or rejected. Never retried.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The service could not be reached. Retried inside waiting loops.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// The service returned a payload that does not decode into the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The service refused the call with an unexpected client-error status.
    #[error("request rejected by the service (HTTP {status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        message: String,
    },

    /// A caller-supplied value is invalid (bad DNS type, bad address).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation was cancelled through its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// Client setup failed.
    #[error(transparent)]
    Initialization(#[from] InitializationError),
}

impl From<ReqwestError> for Error {
    fn from(err: ReqwestError) -> Self {
        Error::Network(NetworkError::Http(err))
    }
}

impl From<tungstenite::Error> for Error {
    fn from(err: tungstenite::Error) -> Self {
        Error::Network(NetworkError::WebSocket(err))
    }
}

/// Categories of failures, used for retry decisions and log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    // HTTP/Network errors
    HttpRequestBuilderError,
    HttpRequestRedirectError,
    HttpRequestTimeoutError,
    HttpRequestRequestError,
    HttpRequestConnectError,
    HttpRequestBodyError,
    HttpRequestDecodeError,
    HttpRequestOtherError,
    // Status codes the service uses
    HttpRequestUnauthorized,       // 401
    HttpRequestForbidden,          // 403
    HttpRequestNotFound,           // 404
    HttpRequestTooManyRequests,    // 429
    HttpRequestServerError,        // 5xx
    HttpRequestClientError,        // other 4xx
    // Push channel
    WebSocketError,
    WebSocketClosed,
    // Non-transport
    AuthenticationError,
    MalformedResponseError,
    InvalidArgumentError,
    Cancelled,
    InitializationError,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::HttpRequestBuilderError => "HTTP request builder error",
            ErrorType::HttpRequestRedirectError => "HTTP request redirect error",
            ErrorType::HttpRequestTimeoutError => "HTTP request timeout error",
            ErrorType::HttpRequestRequestError => "HTTP request error",
            ErrorType::HttpRequestConnectError => "HTTP request connect error",
            ErrorType::HttpRequestBodyError => "HTTP request body error",
            ErrorType::HttpRequestDecodeError => "HTTP request decode error",
            ErrorType::HttpRequestOtherError => "HTTP request other error",
            ErrorType::HttpRequestUnauthorized => "Unauthorized (401)",
            ErrorType::HttpRequestForbidden => "Forbidden (403)",
            ErrorType::HttpRequestNotFound => "Not Found (404)",
            ErrorType::HttpRequestTooManyRequests => "Too many requests",
            ErrorType::HttpRequestServerError => "Server error (5xx)",
            ErrorType::HttpRequestClientError => "Client error (4xx)",
            ErrorType::WebSocketError => "WebSocket error",
            ErrorType::WebSocketClosed => "WebSocket closed",
            ErrorType::AuthenticationError => "Authentication error",
            ErrorType::MalformedResponseError => "Malformed response",
            ErrorType::InvalidArgumentError => "Invalid argument",
            ErrorType::Cancelled => "Cancelled",
            ErrorType::InitializationError => "Initialization error",
        }
    }

    /// Whether a failure of this kind may succeed if attempted again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorType::HttpRequestTimeoutError
                | ErrorType::HttpRequestRequestError
                | ErrorType::HttpRequestConnectError
                | ErrorType::HttpRequestBodyError
                | ErrorType::HttpRequestOtherError
                | ErrorType::HttpRequestTooManyRequests
                | ErrorType::HttpRequestServerError
                | ErrorType::WebSocketError
                | ErrorType::WebSocketClosed
        )
    }
}
