//! Token sourcing and local token inspection.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

/// Where a session's token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSource {
    /// Passed in the client configuration.
    Explicit,
    /// Read from the configured environment variable.
    Environment,
    /// Minted by the service at construction.
    Generated,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TokenSource::Explicit => "explicit",
            TokenSource::Environment => "environment",
            TokenSource::Generated => "generated",
        })
    }
}

/// Picks the token to use: explicit beats environment; blank values count as absent.
///
/// Returns `None` when a token has to be minted.
pub fn select_token(
    explicit: Option<&str>,
    environment: Option<&str>,
) -> Option<(String, TokenSource)> {
    fn present(value: Option<&str>) -> Option<&str> {
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    if let Some(token) = present(explicit) {
        return Some((token.to_string(), TokenSource::Explicit));
    }
    present(environment).map(|token| (token.to_string(), TokenSource::Environment))
}

#[derive(Deserialize)]
struct Claims {
    subdomain: Option<String>,
}

/// Reads the `subdomain` claim of a JWT without verifying its signature.
///
/// Returns `None` for anything that is not a three-part JWT with a non-empty
/// `subdomain` claim; the caller then asks the service instead.
pub fn subdomain_from_jwt(token: &str) -> Option<String> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    claims.subdomain.filter(|s| !s.is_empty())
}
