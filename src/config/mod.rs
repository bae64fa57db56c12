//! Client configuration and constants.
//!
//! This module provides:
//! - Configuration constants (service location, endpoints, retry defaults)
//! - The library configuration struct and its enums
//! - CLI option types and parsing

pub mod cli;
mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{Backlog, ClientConfig, Delivery, LogFormat, LogLevel, RetryPolicy, Scheme};
