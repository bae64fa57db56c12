//! REST calls against the requestrepo service.
//!
//! `ApiClient` is a thin mapping of the service's endpoints: it attaches the
//! session token, maps status codes onto the error taxonomy and decodes
//! payloads. It holds no session state and never retries; retry policy
//! belongs to the waiting loops in `client`.

pub mod models;

use log::debug;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::config::{
    ClientConfig, ENDPOINT_DELETE_ALL_REQUESTS, ENDPOINT_DELETE_REQUEST, ENDPOINT_GET_DNS,
    ENDPOINT_GET_FILE, ENDPOINT_GET_REQUESTS, ENDPOINT_GET_TOKEN, ENDPOINT_UPDATE_DNS,
    ENDPOINT_UPDATE_FILE, ENDPOINT_WHOAMI, HTTP_STATUS_FORBIDDEN, HTTP_STATUS_NOT_FOUND,
    HTTP_STATUS_TOO_MANY_REQUESTS, HTTP_STATUS_UNAUTHORIZED,
};
use crate::error_handling::{Error, NetworkError, Result};
use crate::initialization::init_client;
use crate::utils::sanitize::sanitize_and_truncate_error_message;

use models::{decode_request_list, CapturedRequest, DnsRecord, HttpResponse, WireResponse};

/// A freshly minted session token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub token: String,
    /// Present when the service reports the subdomain alongside the token.
    #[serde(default)]
    pub subdomain: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Whoami {
    subdomain: String,
}

/// Paging parameters for request listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Stateless client for the service's REST endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// Builds the HTTP client and resolves the service root from `config`.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            http: init_client(config)?,
            base: config.base_url()?,
        })
    }

    /// Service root this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str, token: Option<&str>) -> Result<Url> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| Error::InvalidArgument(format!("invalid endpoint {}: {}", path, e)))?;
        if let Some(token) = token {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }

    /// `POST /api/get_token`: mints a new session.
    pub async fn mint_token(&self) -> Result<TokenGrant> {
        let url = self.endpoint(ENDPOINT_GET_TOKEN, None)?;
        debug!("Requesting a new token from {}", self.base);
        let response = check_status(self.http.post(url).send().await?).await?;
        let grant: TokenGrant = decode_json(response, "token grant").await?;
        if grant.token.is_empty() {
            return Err(Error::MalformedResponse(
                "service returned an empty token".to_string(),
            ));
        }
        Ok(grant)
    }

    /// `GET /api/whoami`: asks the service which subdomain a token belongs to.
    pub async fn whoami(&self, token: &str) -> Result<String> {
        let url = self.endpoint(ENDPOINT_WHOAMI, Some(token))?;
        let response = check_status(self.http.get(url).send().await?).await?;
        let whoami: Whoami = decode_json(response, "session info").await?;
        if whoami.subdomain.is_empty() {
            return Err(Error::Authentication(
                "service did not assign a subdomain to this token".to_string(),
            ));
        }
        Ok(whoami.subdomain)
    }

    /// `GET /api/get_requests`: captured requests in server order.
    pub async fn list_requests(&self, token: &str, page: Page) -> Result<Vec<CapturedRequest>> {
        let mut url = self.endpoint(ENDPOINT_GET_REQUESTS, Some(token))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(limit) = page.limit {
                query.append_pair("limit", &limit.to_string());
            }
            if let Some(offset) = page.offset {
                query.append_pair("offset", &offset.to_string());
            }
        }
        let response = check_status(self.http.get(url).send().await?).await?;
        let listing: Value = decode_json(response, "request listing").await?;
        decode_request_list(listing)
    }

    /// `POST /api/delete_request`: `false` when the id does not exist.
    pub async fn delete_request(&self, token: &str, id: &str) -> Result<bool> {
        let url = self.endpoint(ENDPOINT_DELETE_REQUEST, Some(token))?;
        let response = self.http.post(url).json(&json!({ "id": id })).send().await?;
        if response.status().as_u16() == HTTP_STATUS_NOT_FOUND {
            return Ok(false);
        }
        check_status(response).await?;
        Ok(true)
    }

    /// `POST /api/delete_all_requests`: succeeds when nothing is left to delete.
    pub async fn delete_all_requests(&self, token: &str) -> Result<()> {
        let url = self.endpoint(ENDPOINT_DELETE_ALL_REQUESTS, Some(token))?;
        let response = self.http.post(url).send().await?;
        if response.status().as_u16() == HTTP_STATUS_NOT_FOUND {
            debug!("Nothing to delete");
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }

    /// `GET /api/get_file`: the HTTP response served on the subdomain.
    pub async fn get_file(&self, token: &str) -> Result<HttpResponse> {
        let url = self.endpoint(ENDPOINT_GET_FILE, Some(token))?;
        let response = check_status(self.http.get(url).send().await?).await?;
        let wire: WireResponse = decode_json(response, "response configuration").await?;
        HttpResponse::try_from(wire)
    }

    /// `POST /api/update_file`: replaces the served HTTP response.
    pub async fn update_file(&self, token: &str, response: &HttpResponse) -> Result<bool> {
        let url = self.endpoint(ENDPOINT_UPDATE_FILE, Some(token))?;
        let wire = WireResponse::from(response);
        let response = self.http.post(url).json(&wire).send().await?;
        accepted(response).await
    }

    /// `GET /api/get_dns`: DNS records served below the subdomain.
    pub async fn get_dns(&self, token: &str) -> Result<Vec<DnsRecord>> {
        let url = self.endpoint(ENDPOINT_GET_DNS, Some(token))?;
        let response = check_status(self.http.get(url).send().await?).await?;
        decode_json(response, "DNS records").await
    }

    /// `POST /api/update_dns`: replaces every DNS record.
    pub async fn update_dns(&self, token: &str, records: &[DnsRecord]) -> Result<bool> {
        let url = self.endpoint(ENDPOINT_UPDATE_DNS, Some(token))?;
        let response = self
            .http
            .post(url)
            .json(&json!({ "records": records }))
            .send()
            .await?;
        accepted(response).await
    }
}

/// Maps the status of a response onto the error taxonomy.
///
/// 401/403 become `Authentication`, 5xx and 429 become transient `Network`
/// errors, any other non-success becomes `Rejected`.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = sanitize_and_truncate_error_message(body.trim());

    if code == HTTP_STATUS_UNAUTHORIZED || code == HTTP_STATUS_FORBIDDEN {
        let reason = if message.is_empty() {
            format!("service rejected the token (HTTP {})", code)
        } else {
            format!("service rejected the token (HTTP {}): {}", code, message)
        };
        return Err(Error::Authentication(reason));
    }
    if status.is_server_error() || code == HTTP_STATUS_TOO_MANY_REQUESTS {
        return Err(Error::Network(NetworkError::Status(status)));
    }
    Err(Error::Rejected {
        status: code,
        message,
    })
}

/// Outcome of an update call: `true` on success, `false` when the service refused the payload.
async fn accepted(response: Response) -> Result<bool> {
    match check_status(response).await {
        Ok(_) => Ok(true),
        Err(Error::Rejected { status, message }) => {
            debug!("Update rejected (HTTP {}): {}", status, message);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let status = response.status();
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| {
        Error::MalformedResponse(format!(
            "could not decode {} (HTTP {}): {}",
            what,
            status.as_u16(),
            e
        ))
    })
}

