//! Error retriability and retry logic.

use std::future::Future;

use log::warn;
use tokio_retry::RetryIf;
use tokio_util::sync::CancellationToken;

use crate::config::RetryPolicy;
use crate::error_handling::{get_retry_strategy, Error, Result};

/// Determines if an error is retriable (should be retried).
///
/// # Retriable Errors
///
/// - Network timeouts, connection failures, request errors
/// - Server errors (5xx HTTP status codes) and rate limiting (429)
/// - WebSocket failures and unexpected closes
///
/// # Non-Retriable Errors
///
/// - Authentication failures (401, 403, rejected or malformed token)
/// - Other client errors (4xx)
/// - Malformed payloads and decode errors
/// - Invalid arguments and cancellation
pub(crate) fn is_retriable_error(error: &Error) -> bool {
    error.is_retriable()
}

/// Runs `action`, retrying transient failures with bounded exponential backoff.
///
/// Permanent failures are returned at once. When the retry budget is spent the
/// last error is returned. Cancelling `cancel` aborts both the in-flight
/// attempt and any backoff sleep with `Error::Cancelled`.
pub(crate) async fn retry_transient<T, A, F>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: &str,
    action: A,
) -> Result<T>
where
    A: FnMut() -> F,
    F: Future<Output = Result<T>>,
{
    let attempt = RetryIf::start(get_retry_strategy(policy), action, |error: &Error| {
        let retriable = is_retriable_error(error);
        if retriable {
            warn!("{} failed ({}), retrying: {}", operation, error.error_type(), error);
        }
        retriable
    });

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = attempt => result,
    }
}
