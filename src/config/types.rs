//! Configuration types.
//!
//! This module defines the library configuration (`ClientConfig`) and the
//! small enums it is built from. The CLI layer in `config::cli` maps onto
//! these types; nothing here depends on clap except the `ValueEnum` derives.

use std::time::Duration;

use clap::ValueEnum;
use url::Url;

use crate::config::constants::{
    DEFAULT_HOST, DEFAULT_POLL_INTERVAL, DEFAULT_PORT, DEFAULT_USER_AGENT, HTTP_TIMEOUT_SECS,
    MAX_POLL_INTERVAL, RETRY_BASE_MS, RETRY_FACTOR, RETRY_MAX_ATTEMPTS, RETRY_MAX_DELAY_SECS,
    TOKEN_ENV_VAR,
};
use crate::error_handling::{Error, Result};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// URL scheme used to reach the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Scheme {
    /// TLS (default)
    Https,
    /// Plain HTTP, for self-hosted instances and tests
    Http,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Https => "https",
            Scheme::Http => "http",
        }
    }

    /// Matching WebSocket scheme for the push channel.
    pub fn websocket(&self) -> &'static str {
        match self {
            Scheme::Https => "wss",
            Scheme::Http => "ws",
        }
    }
}

/// How `get_request` and `await_requests` learn about new requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Delivery {
    /// Re-fetch the request list every poll interval.
    Poll,
    /// Subscribe to the service's WebSocket and wait for pushed requests.
    Push,
}

/// Treatment of requests already stored server-side when the client first looks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backlog {
    /// Stored requests that were never returned count as new.
    Deliver,
    /// The first observation only primes the cursor; only later arrivals are delivered.
    Skip,
}

/// Bounded exponential backoff used for transient network failures while waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Base of the exponential backoff in milliseconds
    pub base_ms: u64,
    /// Multiplier applied to every step
    pub factor: u64,
    /// Cap on a single delay
    pub max_delay: Duration,
    /// Retries after the first failed attempt
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_ms: RETRY_BASE_MS,
            factor: RETRY_FACTOR,
            max_delay: Duration::from_secs(RETRY_MAX_DELAY_SECS),
            max_attempts: RETRY_MAX_ATTEMPTS,
        }
    }
}

/// Library configuration (no CLI dependencies).
///
/// Token sourcing is resolved once, at construction of the client, from
/// `token`, then the `token_env_var` environment variable, then a freshly
/// minted token.
///
/// # Examples
///
/// ```no_run
/// use requestrepo::ClientConfig;
///
/// let config = ClientConfig {
///     token: Some("eyJhbGciOi...".to_string()),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Explicit session token (highest precedence)
    pub token: Option<String>,

    /// Environment variable consulted when `token` is unset
    pub token_env_var: String,

    /// Service host name
    pub host: String,

    /// Suffix captures are served under (`<subdomain>.<suffix>`); defaults to `host`
    pub capture_domain: Option<String>,

    /// Service port
    pub port: u16,

    /// Service scheme
    pub scheme: Scheme,

    /// Verify TLS certificates
    pub verify: bool,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// HTTP User-Agent header value
    pub user_agent: String,

    /// Delay between polls while waiting for new requests
    pub poll_interval: Duration,

    /// Backoff for transient failures inside waiting loops
    pub retry: RetryPolicy,

    /// Polling or WebSocket delivery
    pub delivery: Delivery,

    /// What to do with requests stored before the first observation
    pub backlog: Backlog,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token: None,
            token_env_var: TOKEN_ENV_VAR.to_string(),
            host: DEFAULT_HOST.to_string(),
            capture_domain: None,
            port: DEFAULT_PORT,
            scheme: Scheme::Https,
            verify: true,
            timeout_seconds: HTTP_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry: RetryPolicy::default(),
            delivery: Delivery::Poll,
            backlog: Backlog::Deliver,
        }
    }
}

impl ClientConfig {
    /// Root URL of the service, e.g. `https://requestrepo.com:443/`.
    pub fn base_url(&self) -> Result<Url> {
        let raw = format!("{}://{}:{}/", self.scheme.as_str(), self.host, self.port);
        Url::parse(&raw)
            .map_err(|e| Error::InvalidArgument(format!("invalid service address {raw}: {e}")))
    }

    /// WebSocket URL of the push channel.
    pub fn websocket_url(&self) -> Result<Url> {
        let raw = format!(
            "{}://{}:{}{}",
            self.scheme.websocket(),
            self.host,
            self.port,
            crate::config::ENDPOINT_WEBSOCKET
        );
        Url::parse(&raw)
            .map_err(|e| Error::InvalidArgument(format!("invalid websocket address {raw}: {e}")))
    }

    /// Domain suffix the session's subdomain lives under.
    pub fn capture_suffix(&self) -> &str {
        self.capture_domain.as_deref().unwrap_or(&self.host)
    }

    /// Checks the configuration for values that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::InvalidArgument("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(Error::InvalidArgument("port must not be 0".to_string()));
        }
        if self.timeout_seconds == 0 {
            return Err(Error::InvalidArgument(
                "timeout_seconds must be at least 1".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidArgument(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        if self.token_env_var.is_empty() {
            return Err(Error::InvalidArgument(
                "token_env_var must not be empty".to_string(),
            ));
        }
        self.base_url().map(|_| ())
    }

    /// Polling interval capped at `MAX_POLL_INTERVAL`.
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval.min(MAX_POLL_INTERVAL)
    }
}
