//! Client initialization and resource setup.
//!
//! This module provides functions to initialize shared resources:
//! - The HTTP client used for REST calls
//! - The process-wide rustls crypto provider used by the push channel
//! - The logger (for binaries)

mod client;
mod logger;

use rustls::crypto::{ring::default_provider, CryptoProvider};

// Re-export public API
pub use client::init_client;
pub use logger::init_logger_with;

/// Initializes the crypto provider for TLS operations.
///
/// Configures the global crypto provider for `rustls`. The WebSocket
/// connector relies on the process default, so this runs before the push
/// channel connects.
pub fn init_crypto_provider() {
    // Err only means a provider is already installed
    let _ = CryptoProvider::install_default(default_provider());
}
