//! requestrepo library: client for the requestrepo.com capture service
//!
//! A session owns a subdomain of the service; every HTTP request and DNS
//! query sent to it is recorded. This crate authenticates the session,
//! fetches and deletes captured requests, waits for new ones (by polling or
//! over the service's WebSocket), and manages the HTTP response and DNS
//! records served on the subdomain.
//!
//! # Example
//!
//! ```no_run
//! use requestrepo::{ClientConfig, Requestrepo};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = Requestrepo::new(ClientConfig::default()).await?;
//! println!("Send something to {}", client.domain());
//!
//! for request in client.get_old_requests().await? {
//!     println!("{} {}", request.kind(), request.id());
//! }
//!
//! let next = client.get_request().await?;
//! println!("New {} request from {:?}", next.kind(), next.ip());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! The async client requires a Tokio runtime. Callers without one use
//! [`blocking::Requestrepo`].

pub mod api;
pub mod blocking;
mod client;
pub mod config;
mod error_handling;
pub mod initialization;
pub mod session;
mod utils;

// Re-export public API
pub use api::models::{
    CapturedRequest, DnsRecord, DnsType, Header, HttpResponse, RequestKind, ResponseUpdate,
};
pub use client::{Client, RequestRepo, Requestrepo};
pub use config::{Backlog, ClientConfig, Delivery, LogFormat, LogLevel, RetryPolicy, Scheme};
pub use error_handling::{Error, ErrorType, InitializationError, NetworkError, Result};
pub use session::{Session, TokenSource};
pub use tokio_util::sync::CancellationToken;
