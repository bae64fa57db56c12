//! Wire models for the requestrepo API.
//!
//! Captured requests are kept as pass-through documents: the service owns
//! their schema, so only the fields every record carries are typed and the
//! rest is reachable through [`CapturedRequest::get`]. Response and DNS
//! configuration have a small fixed shape and are typed fully.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::EnumIter;

use crate::error_handling::{Error, Result};

/// Protocol a captured request arrived over.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Http,
    Dns,
    /// Any other `type` value, kept verbatim.
    Other(String),
}

impl RequestKind {
    fn from_wire(value: Option<&str>) -> Self {
        match value {
            Some(kind) if kind.eq_ignore_ascii_case("http") => RequestKind::Http,
            Some(kind) if kind.eq_ignore_ascii_case("dns") => RequestKind::Dns,
            Some(other) => RequestKind::Other(other.to_string()),
            None => RequestKind::Other(String::new()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RequestKind::Http => "http",
            RequestKind::Dns => "dns",
            RequestKind::Other(other) => other,
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One HTTP or DNS interaction recorded against the session's subdomain.
///
/// Serializes back to exactly the document the service sent.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedRequest {
    id: String,
    kind: RequestKind,
    raw: Vec<u8>,
    document: Map<String, Value>,
}

impl CapturedRequest {
    /// Decodes one record from the service.
    ///
    /// # Errors
    ///
    /// `Error::MalformedResponse` if the value is not an object, carries no
    /// `_id`, or has a `raw` field that is not valid base64.
    pub fn from_value(value: Value) -> Result<Self> {
        let document = match value {
            Value::Object(map) => map,
            other => {
                return Err(Error::MalformedResponse(format!(
                    "captured request is not an object: {}",
                    other
                )))
            }
        };

        let id = match document.get("_id").or_else(|| document.get("id")) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(Error::MalformedResponse(
                    "captured request has no _id".to_string(),
                ))
            }
        };

        let kind = RequestKind::from_wire(document.get("type").and_then(Value::as_str));

        let raw = match document.get("raw") {
            Some(Value::String(encoded)) => STANDARD.decode(encoded).map_err(|e| {
                Error::MalformedResponse(format!("request {} has invalid raw payload: {}", id, e))
            })?,
            _ => Vec::new(),
        };

        Ok(Self {
            id,
            kind,
            raw,
            document,
        })
    }

    /// Server-assigned unique id.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &RequestKind {
        &self.kind
    }

    /// Matches HTTP requests.
    pub fn is_http(&self) -> bool {
        self.kind == RequestKind::Http
    }

    /// Matches DNS queries.
    pub fn is_dns(&self) -> bool {
        self.kind == RequestKind::Dns
    }

    /// Capture time as unix seconds, when the record carries one.
    pub fn date(&self) -> Option<i64> {
        match self.document.get("date")? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Decoded raw bytes of the request as received by the service.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Any field of the underlying document.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    /// A string field of the underlying document.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.document.get(key).and_then(Value::as_str)
    }

    /// Source address.
    pub fn ip(&self) -> Option<&str> {
        self.get_str("ip")
    }

    /// HTTP method (HTTP requests only).
    pub fn method(&self) -> Option<&str> {
        self.get_str("method")
    }

    /// HTTP path (HTTP requests only).
    pub fn path(&self) -> Option<&str> {
        self.get_str("path")
    }

    /// Queried name (DNS requests only).
    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    /// HTTP headers as sent by the client, when present.
    pub fn headers(&self) -> Option<&Map<String, Value>> {
        self.document.get("headers").and_then(Value::as_object)
    }

    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.document)
    }
}

impl Serialize for CapturedRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.document.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CapturedRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        CapturedRequest::from_value(value).map_err(de::Error::custom)
    }
}

/// Decodes a record listing, accepting a bare array or a `{"data": [...]}` envelope.
///
/// Elements may themselves be JSON-encoded strings, as the push channel sends them.
pub(crate) fn decode_request_list(value: Value) -> Result<Vec<CapturedRequest>> {
    match value {
        Value::Array(items) => items.into_iter().map(decode_request_entry).collect(),
        Value::Object(mut map) if map.contains_key("data") => {
            let data = map.remove("data").unwrap_or(Value::Null);
            match data {
                Value::Array(_) => decode_request_list(data),
                other => Ok(vec![decode_request_entry(other)?]),
            }
        }
        other => Err(Error::MalformedResponse(format!(
            "expected a list of requests, got: {}",
            truncate_for_error(&other)
        ))),
    }
}

/// Decodes one record that may be inline or a JSON-encoded string.
pub(crate) fn decode_request_entry(value: Value) -> Result<CapturedRequest> {
    match value {
        Value::String(encoded) => {
            let inner: Value = serde_json::from_str(&encoded).map_err(|e| {
                Error::MalformedResponse(format!("captured request is not valid JSON: {}", e))
            })?;
            CapturedRequest::from_value(inner)
        }
        other => CapturedRequest::from_value(other),
    }
}

fn truncate_for_error(value: &Value) -> String {
    crate::utils::sanitize::sanitize_and_truncate_error_message(&value.to_string())
}

/// DNS record type supported by the service, numbered as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum DnsType {
    A,
    Aaaa,
    Cname,
    Txt,
}

impl DnsType {
    /// Wire index.
    pub fn index(&self) -> u8 {
        match self {
            DnsType::A => 0,
            DnsType::Aaaa => 1,
            DnsType::Cname => 2,
            DnsType::Txt => 3,
        }
    }

    pub fn from_index(index: u8) -> Result<Self> {
        match index {
            0 => Ok(DnsType::A),
            1 => Ok(DnsType::Aaaa),
            2 => Ok(DnsType::Cname),
            3 => Ok(DnsType::Txt),
            other => Err(Error::InvalidArgument(format!(
                "invalid DNS type index {}: must be between 0 and 3",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DnsType::A => "A",
            DnsType::Aaaa => "AAAA",
            DnsType::Cname => "CNAME",
            DnsType::Txt => "TXT",
        }
    }
}

impl fmt::Display for DnsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DnsType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        if let Ok(index) = name.parse::<u8>() {
            return DnsType::from_index(index);
        }
        match name.to_ascii_uppercase().as_str() {
            "A" => Ok(DnsType::A),
            "AAAA" => Ok(DnsType::Aaaa),
            "CNAME" => Ok(DnsType::Cname),
            "TXT" => Ok(DnsType::Txt),
            _ => Err(Error::InvalidArgument(format!(
                "invalid DNS type {:?}: must be one of A, AAAA, CNAME, TXT",
                s
            ))),
        }
    }
}

impl Serialize for DnsType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.index())
    }
}

impl<'de> Deserialize<'de> for DnsType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Index(u8),
            Name(String),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Index(index) => DnsType::from_index(index).map_err(de::Error::custom),
            Wire::Name(name) => name.parse().map_err(de::Error::custom),
        }
    }
}

/// A DNS record served below the session domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Label below the session domain (e.g. `www`)
    pub domain: String,
    #[serde(rename = "type")]
    pub record_type: DnsType,
    pub value: String,
}

impl DnsRecord {
    pub fn new(domain: impl Into<String>, record_type: DnsType, value: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            record_type,
            value: value.into(),
        }
    }
}

/// One response header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub header: String,
    pub value: String,
}

impl Header {
    pub fn new(header: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            value: value.into(),
        }
    }
}

/// The HTTP response the service serves on the session's subdomain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Response body
    pub raw: Vec<u8>,
    /// Headers, in the order they are served
    pub headers: Vec<Header>,
    pub status_code: u16,
}

impl HttpResponse {
    /// First header with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.header.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// `HttpResponse` as it travels: base64 body and a header list.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireResponse {
    #[serde(default)]
    pub raw: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    pub status_code: u16,
}

impl TryFrom<WireResponse> for HttpResponse {
    type Error = Error;

    fn try_from(wire: WireResponse) -> Result<Self> {
        let raw = STANDARD
            .decode(&wire.raw)
            .map_err(|e| Error::MalformedResponse(format!("response body is not base64: {}", e)))?;
        Ok(Self {
            raw,
            headers: wire.headers,
            status_code: wire.status_code,
        })
    }
}

impl From<&HttpResponse> for WireResponse {
    fn from(response: &HttpResponse) -> Self {
        Self {
            raw: STANDARD.encode(&response.raw),
            headers: response.headers.clone(),
            status_code: response.status_code,
        }
    }
}

/// Partial update of the served HTTP response; unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseUpdate {
    pub headers: Option<Vec<Header>>,
    pub raw: Option<Vec<u8>>,
    pub status_code: Option<u16>,
}

impl ResponseUpdate {
    pub fn headers(mut self, headers: Vec<Header>) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn body(mut self, raw: impl Into<Vec<u8>>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    pub fn status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_none() && self.raw.is_none() && self.status_code.is_none()
    }

    /// Applies the set fields onto `response`.
    pub fn apply(self, response: &mut HttpResponse) {
        if let Some(headers) = self.headers {
            response.headers = headers;
        }
        if let Some(raw) = self.raw {
            response.raw = raw;
        }
        if let Some(status_code) = self.status_code {
            response.status_code = status_code;
        }
    }
}
