//! The capture client.
//!
//! [`Requestrepo`] owns one session and exposes the request, response and DNS
//! operations of the service. Waiting operations (`get_request*`,
//! `await_requests`) take `&mut self`: the delivery cursor has a single
//! writer, and every request is handed out at most once per client.

mod cursor;
mod push;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::api::models::{CapturedRequest, DnsRecord, DnsType, HttpResponse, ResponseUpdate};
use crate::api::{ApiClient, Page};
use crate::config::{ClientConfig, Delivery};
use crate::error_handling::{get_retry_strategy, Error, Result};
use crate::session::{Session, TokenSource};
use crate::utils::retry_transient;

use cursor::PollCursor;
use push::PushChannel;

/// Client for one requestrepo session.
///
/// # Examples
///
/// ```no_run
/// # async fn run() -> requestrepo::Result<()> {
/// let mut client = requestrepo::Requestrepo::connect().await?;
/// println!("send something to {}", client.domain());
/// let request = client.get_request().await?;
/// println!("got {} from {:?}", request.kind(), request.ip());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Requestrepo {
    config: ClientConfig,
    api: ApiClient,
    session: Arc<Session>,
    cursor: PollCursor,
    push: Option<PushChannel>,
    /// Consecutive push connections lost without delivering anything new.
    push_drops: usize,
    shutdown: CancellationToken,
}

/// Alias kept for callers used to the mixed-case name.
pub type RequestRepo = Requestrepo;

/// Short alias.
pub type Client = Requestrepo;

impl Requestrepo {
    /// Creates a client, resolves its session and checks the token.
    ///
    /// A token is minted when none is configured. A configured token is
    /// always checked against the service before this returns: by the push
    /// handshake in `Delivery::Push`, otherwise by the whoami call, which
    /// also names the subdomain when the token does not.
    ///
    /// # Errors
    ///
    /// `Error::InvalidArgument` for an unusable configuration,
    /// `Error::Authentication` when the token is rejected (expired, revoked
    /// or malformed) and `Error::Network` when the service cannot be reached.
    pub async fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        if config.delivery == Delivery::Push && !config.verify {
            warn!("TLS verification cannot be disabled for the push channel; it stays on");
        }

        let api = ApiClient::new(&config)?;
        let mut session = Session::resolve(&config, &api).await?;
        let shutdown = CancellationToken::new();
        let mut cursor = PollCursor::new();

        let push = match config.delivery {
            Delivery::Push => {
                let (channel, history) = open_push(&config, session.token(), &shutdown).await?;
                cursor.admit(history, config.backlog);
                session.confirm();
                Some(channel)
            }
            Delivery::Poll => {
                if !session.is_confirmed() {
                    confirm_token(&api, &session).await?;
                    session.confirm();
                }
                None
            }
        };

        Ok(Self {
            config,
            api,
            session: Arc::new(session),
            cursor,
            push,
            push_drops: 0,
            shutdown,
        })
    }

    /// Creates a client with the default configuration.
    pub async fn connect() -> Result<Self> {
        Self::new(ClientConfig::default()).await
    }

    /// Creates a client for an existing token with otherwise default settings.
    pub async fn with_token(token: impl Into<String>) -> Result<Self> {
        Self::new(ClientConfig {
            token: Some(token.into()),
            ..Default::default()
        })
        .await
    }

    /// Label of this session, e.g. `abcd1234`.
    pub fn subdomain(&self) -> &str {
        self.session.subdomain()
    }

    /// Capture domain, e.g. `abcd1234.requestrepo.com`.
    pub fn domain(&self) -> &str {
        self.session.domain()
    }

    pub fn token(&self) -> &str {
        self.session.token()
    }

    pub fn token_source(&self) -> TokenSource {
        self.session.source()
    }

    /// Shared handle on the session, for reading from other tasks.
    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Token that, once cancelled, makes every waiting call of this client return.
    ///
    /// `get_request*` then fail with `Error::Cancelled` and `await_requests`
    /// returns `Ok(())`.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Every request stored for this session, in server order.
    ///
    /// Fetched afresh on each call and independent of what `get_request` has
    /// delivered. Not retried.
    pub async fn get_old_requests(&self) -> Result<Vec<CapturedRequest>> {
        self.api
            .list_requests(self.session.token(), Page::default())
            .await
    }

    /// One page of stored requests.
    pub async fn list_requests(
        &self,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<CapturedRequest>> {
        self.api
            .list_requests(self.session.token(), Page { limit, offset })
            .await
    }

    /// Deletes one stored request; `false` if no request has that id.
    pub async fn delete_request(&self, id: &str) -> Result<bool> {
        if id.is_empty() {
            return Err(Error::InvalidArgument("request id must not be empty".to_string()));
        }
        self.api.delete_request(self.session.token(), id).await
    }

    /// Deletes every stored request. Succeeds when nothing is stored.
    pub async fn delete_all_requests(&self) -> Result<()> {
        self.api.delete_all_requests(self.session.token()).await?;
        info!("Deleted all requests for {}", self.session.domain());
        Ok(())
    }

    /// Waits for the earliest request this client has not returned yet.
    ///
    /// There is no timeout. Dropping the future abandons the wait without
    /// losing requests; cancelling [`Self::cancellation_token`] makes it fail
    /// with `Error::Cancelled`.
    ///
    /// # Errors
    ///
    /// `Error::Network` once the retry budget for a lost connection is spent,
    /// `Error::Authentication` if the token stops being accepted.
    pub async fn get_request(&mut self) -> Result<CapturedRequest> {
        self.get_request_matching(|_| true).await
    }

    /// Like [`Self::get_request`], also returning `Error::Cancelled` when `cancel` fires.
    pub async fn get_request_with_cancel(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<CapturedRequest> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = self.get_request() => result,
        }
    }

    /// Waits for the earliest unreturned request accepted by `filter`.
    ///
    /// Requests the filter rejects stay queued for later calls.
    pub async fn get_request_matching<F>(&mut self, mut filter: F) -> Result<CapturedRequest>
    where
        F: FnMut(&CapturedRequest) -> bool,
    {
        let shutdown = self.shutdown.clone();
        self.next_matching(&shutdown, &mut filter).await
    }

    /// Waits for the next HTTP request.
    pub async fn get_http_request(&mut self) -> Result<CapturedRequest> {
        self.get_request_matching(CapturedRequest::is_http).await
    }

    /// Waits for the next DNS query.
    pub async fn get_dns_request(&mut self) -> Result<CapturedRequest> {
        self.get_request_matching(CapturedRequest::is_dns).await
    }

    /// Calls `on_request` for every new request, in arrival order, until `cancel` fires.
    ///
    /// Errors returned by the callback, and panics raised in it, are logged
    /// and delivery continues.
    /// Returns `Ok(())` on cancellation, or the first error the loop cannot
    /// recover from.
    pub async fn await_requests<F>(
        &mut self,
        cancel: &CancellationToken,
        mut on_request: F,
    ) -> Result<()>
    where
        F: FnMut(CapturedRequest) -> anyhow::Result<()>,
    {
        let shutdown = self.shutdown.clone();
        let mut accept_all = |_: &CapturedRequest| true;
        let mut delivered: u64 = 0;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = self.next_matching(&shutdown, &mut accept_all) => next,
            };

            let request = match next {
                Ok(request) => request,
                Err(Error::Cancelled) => break,
                Err(e) => return Err(e),
            };

            let id = request.id().to_string();
            match panic::catch_unwind(AssertUnwindSafe(|| on_request(request))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Request handler failed for {}: {:#}", id, e),
                Err(_) => warn!("Request handler panicked for {}", id),
            }
            delivered += 1;
        }
        debug!("Stopped waiting for requests after {} deliveries", delivered);
        Ok(())
    }

    /// The HTTP response served on the subdomain.
    pub async fn response(&self) -> Result<HttpResponse> {
        self.api.get_file(self.session.token()).await
    }

    /// Changes the fields set in `update` and keeps the others.
    ///
    /// Returns `false` when the service refuses the new response.
    pub async fn update_response(&self, update: ResponseUpdate) -> Result<bool> {
        let token = self.session.token();
        let mut response = self.api.get_file(token).await?;
        update.apply(&mut response);
        self.api.update_file(token, &response).await
    }

    /// DNS records served below the subdomain.
    pub async fn dns(&self) -> Result<Vec<DnsRecord>> {
        self.api.get_dns(self.session.token()).await
    }

    /// Replaces every DNS record.
    pub async fn update_dns(&self, records: &[DnsRecord]) -> Result<bool> {
        self.api.update_dns(self.session.token(), records).await
    }

    /// Sets the `record_type` record of `domain`, adding it when missing.
    pub async fn add_dns(&self, domain: &str, record_type: DnsType, value: &str) -> Result<bool> {
        if domain.is_empty() {
            return Err(Error::InvalidArgument("DNS domain must not be empty".to_string()));
        }
        let mut records = self.dns().await?;
        match records
            .iter_mut()
            .find(|r| r.domain == domain && r.record_type == record_type)
        {
            Some(existing) => existing.value = value.to_string(),
            None => records.push(DnsRecord::new(domain, record_type, value)),
        }
        self.update_dns(&records).await
    }

    /// Removes the records of `domain`, only those of `record_type` when given.
    ///
    /// Returns `false` without writing when nothing matched.
    pub async fn remove_dns(&self, domain: &str, record_type: Option<DnsType>) -> Result<bool> {
        let records = self.dns().await?;
        let before = records.len();
        let kept: Vec<DnsRecord> = records
            .into_iter()
            .filter(|r| !(r.domain == domain && record_type.map_or(true, |t| r.record_type == t)))
            .collect();
        if kept.len() == before {
            debug!("No DNS record of {} to remove", domain);
            return Ok(false);
        }
        self.update_dns(&kept).await
    }

    /// Cancels pending waits and closes the push channel.
    pub async fn close(mut self) {
        self.shutdown.cancel();
        if let Some(channel) = self.push.take() {
            channel.close().await;
        }
    }

    async fn next_matching<F>(
        &mut self,
        cancel: &CancellationToken,
        filter: &mut F,
    ) -> Result<CapturedRequest>
    where
        F: FnMut(&CapturedRequest) -> bool + ?Sized,
    {
        let mut first_round = true;
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if let Some(request) = self.cursor.take_matching(filter) {
                return Ok(request);
            }

            if !first_round && self.config.delivery == Delivery::Poll {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(self.config.effective_poll_interval()) => {}
                }
            }
            first_round = false;

            let queued = self.observe(cancel).await?;
            if queued > 0 {
                debug!(
                    "{} new requests queued ({} pending, {} seen)",
                    queued,
                    self.cursor.pending_len(),
                    self.cursor.seen_len()
                );
            }
        }
    }

    /// Fetches whatever the service has and queues the unseen part.
    async fn observe(&mut self, cancel: &CancellationToken) -> Result<usize> {
        let backlog = self.config.backlog;
        match self.config.delivery {
            Delivery::Poll => {
                let api = &self.api;
                let token = self.session.token();
                let batch = retry_transient(&self.config.retry, cancel, "poll", move || {
                    api.list_requests(token, Page::default())
                })
                .await?;
                Ok(self.cursor.admit(batch, backlog))
            }
            Delivery::Push => {
                if let Some(channel) = self.push.as_mut() {
                    let received = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(Error::Cancelled),
                        received = channel.recv() => received,
                    };
                    match received {
                        Ok(batch) => {
                            self.push_drops = 0;
                            return Ok(self.cursor.admit(batch, backlog));
                        }
                        Err(e) if e.is_retriable() => {
                            self.push = None;
                            self.push_drops += 1;
                            if self.push_drops > self.config.retry.max_attempts {
                                warn!(
                                    "Push channel lost {} times in a row, giving up",
                                    self.push_drops
                                );
                                return Err(e);
                            }
                            let delay = get_retry_strategy(&self.config.retry)
                                .nth(self.push_drops - 1)
                                .unwrap_or_else(|| self.config.effective_poll_interval());
                            warn!("Push channel lost ({}), reconnecting in {:?}", e, delay);
                            tokio::select! {
                                biased;
                                _ = cancel.cancelled() => return Err(Error::Cancelled),
                                _ = tokio::time::sleep(delay) => {}
                            }
                        }
                        Err(e) => return Err(e),
                    }
                }

                let (channel, history) =
                    open_push(&self.config, self.session.token(), cancel).await?;
                self.push = Some(channel);
                let queued = self.cursor.admit(history, backlog);
                if queued > 0 {
                    self.push_drops = 0;
                }
                Ok(queued)
            }
        }
    }
}

/// Connects the push channel, retrying transient failures.
async fn open_push(
    config: &ClientConfig,
    token: &str,
    cancel: &CancellationToken,
) -> Result<(PushChannel, Vec<CapturedRequest>)> {
    let url = config.websocket_url()?;
    let url = &url;
    retry_transient(&config.retry, cancel, "push connect", move || {
        PushChannel::connect(url, token)
    })
    .await
}

/// Asks the service about a token that has not been used yet.
async fn confirm_token(api: &ApiClient, session: &Session) -> Result<()> {
    let subdomain = api.whoami(session.token()).await?;
    if subdomain != session.subdomain() {
        warn!(
            "Token claims subdomain {} but the service reports {}",
            session.subdomain(),
            subdomain
        );
    }
    debug!("Token accepted for {}", session.domain());
    Ok(())
}
