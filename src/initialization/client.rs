//! HTTP client initialization.
//!
//! This module builds the `reqwest::Client` shared by every API call of a
//! session.

use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::{ClientConfig, TCP_CONNECT_TIMEOUT_SECS};
use crate::error_handling::InitializationError;

/// Initializes the HTTP client used for all REST calls.
///
/// Creates a `reqwest::Client` configured with:
/// - User-Agent header from the configuration
/// - Per-request timeout from the configuration
/// - TCP connect timeout of `TCP_CONNECT_TIMEOUT_SECS`
/// - Rustls TLS backend; certificate verification disabled when `verify` is false
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if client creation fails.
pub fn init_client(config: &ClientConfig) -> Result<reqwest::Client, InitializationError> {
    if !config.verify {
        log::warn!("TLS certificate verification is disabled");
    }

    let client = ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .connect_timeout(Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS))
        .user_agent(config.user_agent.clone())
        .danger_accept_invalid_certs(!config.verify)
        .build()?;
    Ok(client)
}
