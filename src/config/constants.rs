//! Configuration constants.
//!
//! This module defines the defaults used throughout the client: service
//! location, endpoint paths, polling cadence and retry strategy.

use std::time::Duration;

// Service location
/// Default requestrepo host.
pub const DEFAULT_HOST: &str = "requestrepo.com";
/// Default port (HTTPS).
pub const DEFAULT_PORT: u16 = 443;

/// Environment variable consulted for a session token when none is passed explicitly.
pub const TOKEN_ENV_VAR: &str = "REQUESTREPO_TOKEN";

/// User-Agent sent with every API call.
pub const DEFAULT_USER_AGENT: &str = concat!("requestrepo-rs/", env!("CARGO_PKG_VERSION"));

// Network operation timeouts
/// Per-request HTTP timeout in seconds
pub const HTTP_TIMEOUT_SECS: u64 = 10;
/// TCP connection timeout in seconds
pub const TCP_CONNECT_TIMEOUT_SECS: u64 = 5;

// API endpoints (relative to the service root)
pub const ENDPOINT_GET_TOKEN: &str = "/api/get_token";
pub const ENDPOINT_WHOAMI: &str = "/api/whoami";
pub const ENDPOINT_GET_REQUESTS: &str = "/api/get_requests";
pub const ENDPOINT_DELETE_REQUEST: &str = "/api/delete_request";
pub const ENDPOINT_DELETE_ALL_REQUESTS: &str = "/api/delete_all_requests";
pub const ENDPOINT_GET_FILE: &str = "/api/get_file";
pub const ENDPOINT_UPDATE_FILE: &str = "/api/update_file";
pub const ENDPOINT_GET_DNS: &str = "/api/get_dns";
pub const ENDPOINT_UPDATE_DNS: &str = "/api/update_dns";
pub const ENDPOINT_WEBSOCKET: &str = "/api/ws";

// Polling
/// Default interval between polls while waiting for new requests.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Upper bound accepted for the polling interval.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(3);

// Retry strategy
/// Base of the exponential backoff in milliseconds.
///
/// `ExponentialBackoff` raises the base to the attempt number and multiplies
/// by the factor, so base 2 with factor 250 yields 500ms, 1s, 2s, 4s...
pub const RETRY_BASE_MS: u64 = 2;
/// Multiplier applied to every backoff step
pub const RETRY_FACTOR: u64 = 250;
/// Maximum delay between retries in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 10;
/// Maximum number of retries after the initial attempt
pub const RETRY_MAX_ATTEMPTS: usize = 5;

// HTTP status codes (for clarity and consistency)
pub const HTTP_STATUS_UNAUTHORIZED: u16 = 401;
pub const HTTP_STATUS_FORBIDDEN: u16 = 403;
pub const HTTP_STATUS_NOT_FOUND: u16 = 404;
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;

// Error message size limits
/// Maximum length, in characters, of service error bodies quoted in errors
pub const MAX_ERROR_MESSAGE_LENGTH: usize = 500;
