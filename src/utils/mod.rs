//! Utility functions.
//!
//! This module provides:
//! - Error retriability determination and bounded retry with cancellation
//! - String sanitization utilities

mod retry;
pub mod sanitize;

pub(crate) use retry::retry_transient;
