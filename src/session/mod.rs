//! Session identity: the token and the subdomain it owns.
//!
//! A session is resolved once when the client is constructed and never
//! changes afterwards.

pub mod token;

use std::fmt;

use log::{debug, info};

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error_handling::{Error, Result};

pub use token::TokenSource;
use token::{select_token, subdomain_from_jwt};

/// Token and capture identity of one client.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    subdomain: String,
    domain: String,
    source: TokenSource,
    confirmed: bool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("subdomain", &self.subdomain)
            .field("domain", &self.domain)
            .field("source", &self.source)
            .field("confirmed", &self.confirmed)
            .finish()
    }
}

impl Session {
    /// Builds a session from already known parts.
    pub fn new(
        token: impl Into<String>,
        subdomain: impl Into<String>,
        suffix: &str,
        source: TokenSource,
    ) -> Result<Self> {
        let subdomain = subdomain.into();
        if subdomain.is_empty() || subdomain.contains('.') {
            return Err(Error::Authentication(format!(
                "invalid subdomain {:?} for this token",
                subdomain
            )));
        }
        let domain = format!("{}.{}", subdomain, suffix.trim_start_matches('.'));
        Ok(Self {
            token: token.into(),
            subdomain,
            domain,
            source,
            confirmed: false,
        })
    }

    /// The token sent with every call.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Label identifying this session, e.g. `abcd1234`.
    pub fn subdomain(&self) -> &str {
        &self.subdomain
    }

    /// Fully qualified capture domain, e.g. `abcd1234.requestrepo.com`.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn source(&self) -> TokenSource {
        self.source
    }

    /// Whether the service has already accepted this token during resolution.
    ///
    /// False for a configured token whose subdomain was read from its own
    /// claims; such a session still has to be checked against the service.
    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub(crate) fn confirm(&mut self) {
        self.confirmed = true;
    }

    /// Resolves the session for `config`.
    ///
    /// Token precedence is the explicit token, then the configured environment
    /// variable, then a token minted by the service. The subdomain is taken
    /// from the mint response or the token's own claims and otherwise asked
    /// of the service.
    ///
    /// # Errors
    ///
    /// `Error::Authentication` when the service rejects the token or cannot
    /// name its subdomain; `Error::Network` when it cannot be reached.
    pub async fn resolve(config: &ClientConfig, api: &ApiClient) -> Result<Self> {
        let environment = std::env::var(&config.token_env_var).ok();
        let selected = select_token(config.token.as_deref(), environment.as_deref());

        let (token, source, granted_subdomain) = match selected {
            Some((token, source)) => {
                debug!("Using {} token", source);
                (token, source, None)
            }
            None => {
                let grant = api.mint_token().await?;
                (grant.token, TokenSource::Generated, grant.subdomain)
            }
        };

        let mut confirmed = source == TokenSource::Generated;
        let subdomain = match granted_subdomain
            .filter(|s| !s.is_empty())
            .or_else(|| subdomain_from_jwt(&token))
        {
            Some(subdomain) => subdomain,
            None => {
                debug!("Token carries no subdomain claim, asking the service");
                confirmed = true;
                api.whoami(&token).await?
            }
        };

        let mut session = Session::new(token, subdomain, config.capture_suffix(), source)?;
        if confirmed {
            session.confirm();
        }

        if session.source == TokenSource::Generated {
            // Generated tokens are printed so the session can be reused.
            eprintln!(
                "[+] Running on {} with token: {}",
                session.domain, session.token
            );
        }
        info!(
            "Session ready on {} ({} token)",
            session.domain, session.source
        );

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_joins_subdomain_and_suffix() {
        let session =
            Session::new("tok-123", "abcd1234", "requestrepo.com", TokenSource::Explicit)
                .unwrap();
        assert_eq!(session.subdomain(), "abcd1234");
        assert_eq!(session.domain(), "abcd1234.requestrepo.com");
        assert_eq!(session.token(), "tok-123");
        assert_eq!(session.source(), TokenSource::Explicit);
    }

    #[test]
    fn test_invalid_subdomain_is_rejected() {
        assert!(matches!(
            Session::new("t", "", "requestrepo.com", TokenSource::Explicit),
            Err(Error::Authentication(_))
        ));
        assert!(matches!(
            Session::new("t", "a.b", "requestrepo.com", TokenSource::Explicit),
            Err(Error::Authentication(_))
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let session =
            Session::new("secret-token", "abcd1234", "requestrepo.com", TokenSource::Generated)
                .unwrap();
        let rendered = format!("{:?}", session);
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("abcd1234"));
    }

    #[test]
    fn test_sessions_built_from_parts_are_unconfirmed() {
        let session =
            Session::new("tok", "abcd1234", "requestrepo.com", TokenSource::Explicit).unwrap();
        assert!(!session.is_confirmed());
    }

    #[test]
    fn test_confirm_marks_session() {
        let mut session =
            Session::new("tok", "abcd1234", "requestrepo.com", TokenSource::Environment).unwrap();
        session.confirm();
        assert!(session.is_confirmed());
    }
}
