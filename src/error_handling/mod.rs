//! Error handling.
//!
//! This module provides:
//! - The client `Error` type and its `Result` alias
//! - Error categorization (`ErrorType`) for retry decisions and logging
//! - Retry strategy configuration
//!
//! Authentication failures, malformed payloads and rejected calls are
//! permanent; transport failures, 5xx and 429 are transient and may be
//! retried by the waiting loops.

mod categorization;
mod types;

// Re-export public API
pub use categorization::get_retry_strategy;
pub use types::{Error, ErrorType, InitializationError, NetworkError, Result};
