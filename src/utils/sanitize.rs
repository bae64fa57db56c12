//! Cleaning of service-provided text before it lands in errors and logs.
//!
//! Error bodies returned by the service are untrusted: they may contain
//! control characters or be arbitrarily long.

use crate::config::MAX_ERROR_MESSAGE_LENGTH;

/// Removes control characters except newline, tab and carriage return.
pub fn sanitize_error_message(message: &str) -> String {
    message
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t' | '\r'))
        .collect()
}

/// Sanitizes a message and truncates it to `MAX_ERROR_MESSAGE_LENGTH` characters.
///
/// Truncation happens on a character boundary and appends the original length.
pub fn sanitize_and_truncate_error_message(message: &str) -> String {
    let sanitized = sanitize_error_message(message);
    let char_count = sanitized.chars().count();

    if char_count <= MAX_ERROR_MESSAGE_LENGTH {
        return sanitized;
    }

    let keep = MAX_ERROR_MESSAGE_LENGTH.saturating_sub(50);
    let truncated: String = sanitized.chars().take(keep).collect();
    format!(
        "{}... (truncated, original length: {} chars)",
        truncated, char_count
    )
}
