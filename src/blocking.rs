//! Synchronous client.
//!
//! Wraps the async [`crate::Requestrepo`] in a private current-thread Tokio
//! runtime so it can be used from plain threads. Do not use it from inside
//! an async runtime; calls would block that runtime's worker.

use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;

use crate::api::models::{CapturedRequest, DnsRecord, DnsType, HttpResponse, ResponseUpdate};
use crate::client;
use crate::config::ClientConfig;
use crate::error_handling::{InitializationError, Result};
use crate::session::{Session, TokenSource};

/// Blocking counterpart of [`crate::Requestrepo`].
///
/// # Examples
///
/// ```no_run
/// let mut client = requestrepo::blocking::Requestrepo::connect()?;
/// println!("send something to {}", client.domain());
/// for request in client.get_old_requests()? {
///     println!("{}", request.id());
/// }
/// # Ok::<(), requestrepo::Error>(())
/// ```
#[derive(Debug)]
pub struct Requestrepo {
    inner: client::Requestrepo,
    runtime: Runtime,
}

impl Requestrepo {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(InitializationError::from)?;
        let inner = runtime.block_on(client::Requestrepo::new(config))?;
        Ok(Self { inner, runtime })
    }

    pub fn connect() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    pub fn with_token(token: impl Into<String>) -> Result<Self> {
        Self::new(ClientConfig {
            token: Some(token.into()),
            ..Default::default()
        })
    }

    pub fn subdomain(&self) -> &str {
        self.inner.subdomain()
    }

    pub fn domain(&self) -> &str {
        self.inner.domain()
    }

    pub fn token(&self) -> &str {
        self.inner.token()
    }

    pub fn token_source(&self) -> TokenSource {
        self.inner.token_source()
    }

    pub fn session(&self) -> Arc<Session> {
        self.inner.session()
    }

    /// Cancelling this token from another thread unblocks waiting calls.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancellation_token()
    }

    pub fn get_old_requests(&self) -> Result<Vec<CapturedRequest>> {
        self.runtime.block_on(self.inner.get_old_requests())
    }

    pub fn list_requests(
        &self,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<CapturedRequest>> {
        self.runtime.block_on(self.inner.list_requests(limit, offset))
    }

    pub fn delete_request(&self, id: &str) -> Result<bool> {
        self.runtime.block_on(self.inner.delete_request(id))
    }

    pub fn delete_all_requests(&self) -> Result<()> {
        self.runtime.block_on(self.inner.delete_all_requests())
    }

    /// Blocks the calling thread until a request this client has not returned arrives.
    pub fn get_request(&mut self) -> Result<CapturedRequest> {
        self.runtime.block_on(self.inner.get_request())
    }

    /// Like [`Self::get_request`], returning `Error::Cancelled` once `cancel` fires.
    pub fn get_request_with_cancel(&mut self, cancel: &CancellationToken) -> Result<CapturedRequest> {
        self.runtime
            .block_on(self.inner.get_request_with_cancel(cancel))
    }

    pub fn get_request_matching<F>(&mut self, filter: F) -> Result<CapturedRequest>
    where
        F: FnMut(&CapturedRequest) -> bool,
    {
        self.runtime
            .block_on(self.inner.get_request_matching(filter))
    }

    pub fn get_http_request(&mut self) -> Result<CapturedRequest> {
        self.runtime.block_on(self.inner.get_http_request())
    }

    pub fn get_dns_request(&mut self) -> Result<CapturedRequest> {
        self.runtime.block_on(self.inner.get_dns_request())
    }

    /// Runs the delivery loop on the calling thread until `cancel` fires.
    pub fn await_requests<F>(&mut self, cancel: &CancellationToken, on_request: F) -> Result<()>
    where
        F: FnMut(CapturedRequest) -> anyhow::Result<()>,
    {
        self.runtime
            .block_on(self.inner.await_requests(cancel, on_request))
    }

    pub fn response(&self) -> Result<HttpResponse> {
        self.runtime.block_on(self.inner.response())
    }

    pub fn update_response(&self, update: ResponseUpdate) -> Result<bool> {
        self.runtime.block_on(self.inner.update_response(update))
    }

    pub fn dns(&self) -> Result<Vec<DnsRecord>> {
        self.runtime.block_on(self.inner.dns())
    }

    pub fn update_dns(&self, records: &[DnsRecord]) -> Result<bool> {
        self.runtime.block_on(self.inner.update_dns(records))
    }

    pub fn add_dns(&self, domain: &str, record_type: DnsType, value: &str) -> Result<bool> {
        self.runtime
            .block_on(self.inner.add_dns(domain, record_type, value))
    }

    pub fn remove_dns(&self, domain: &str, record_type: Option<DnsType>) -> Result<bool> {
        self.runtime
            .block_on(self.inner.remove_dns(domain, record_type))
    }

    pub fn close(self) {
        let Self { inner, runtime } = self;
        runtime.block_on(inner.close());
    }
}
