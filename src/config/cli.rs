//! Command-line options.
//!
//! The binary parses these and converts them into a [`ClientConfig`]; the
//! library itself never reads argv.

use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::api::models::Header;
use crate::config::constants::{DEFAULT_HOST, DEFAULT_PORT, HTTP_TIMEOUT_SECS};
use crate::config::types::{Backlog, ClientConfig, Delivery, LogFormat, LogLevel, Scheme};
use crate::error_handling::{Error, Result};

/// requestrepo: capture HTTP and DNS requests against a personal subdomain.
#[derive(Debug, Parser)]
#[command(name = "requestrepo", version, about)]
pub struct Cli {
    /// Session token (falls back to $REQUESTREPO_TOKEN, then a freshly minted one)
    #[arg(long)]
    pub token: Option<String>,

    /// Service host
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Domain suffix captures are served under (defaults to --host)
    #[arg(long)]
    pub capture_domain: Option<String>,

    /// Service port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Service scheme
    #[arg(long, value_enum, default_value_t = Scheme::Https)]
    pub scheme: Scheme,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = HTTP_TIMEOUT_SECS)]
    pub timeout_seconds: u64,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the session's domain and token
    Token,
    /// Print captured requests as JSON lines
    List {
        /// Maximum number of requests
        #[arg(long)]
        limit: Option<usize>,
        /// Number of requests to skip
        #[arg(long)]
        offset: Option<usize>,
    },
    /// Stream new requests as JSON lines until interrupted
    Watch {
        /// Delivery mechanism
        #[arg(long, value_enum, default_value_t = Delivery::Poll)]
        delivery: Delivery,
        /// Also print requests captured before the watch started
        #[arg(long)]
        backlog: bool,
        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
    /// Delete one captured request
    Delete {
        /// Request id
        id: String,
    },
    /// Delete every captured request
    Clear,
    /// Show or edit DNS records
    Dns {
        #[command(subcommand)]
        action: Option<DnsAction>,
    },
    /// Show or edit the HTTP response served on the subdomain
    Response {
        /// New status code
        #[arg(long)]
        status: Option<u16>,
        /// New body
        #[arg(long)]
        body: Option<String>,
        /// New header, repeatable (`Name: value`); replaces all headers
        #[arg(long = "header")]
        headers: Vec<String>,
    },
}

/// DNS subcommand actions.
#[derive(Debug, Subcommand)]
pub enum DnsAction {
    /// Add or update a record
    Add {
        /// Label below the session domain
        domain: String,
        /// A, AAAA, CNAME or TXT
        record_type: String,
        /// Record value
        value: String,
    },
    /// Remove records for a label
    Remove {
        /// Label below the session domain
        domain: String,
        /// Restrict removal to one record type
        record_type: Option<String>,
    },
}

impl Cli {
    /// Builds the library configuration from the parsed options.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig {
            token: self.token.clone(),
            host: self.host.clone(),
            capture_domain: self.capture_domain.clone(),
            port: self.port,
            scheme: self.scheme,
            verify: !self.insecure,
            timeout_seconds: self.timeout_seconds,
            ..Default::default()
        };
        if let Command::Watch {
            delivery,
            backlog,
            interval_ms,
        } = &self.command
        {
            config.delivery = *delivery;
            config.backlog = if *backlog {
                Backlog::Deliver
            } else {
                Backlog::Skip
            };
            config.poll_interval = Duration::from_millis(*interval_ms);
        }
        config
    }
}

/// Parses a `Name: value` header argument.
pub fn parse_header(raw: &str) -> Result<Header> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| Error::InvalidArgument(format!("header {:?} is not `Name: value`", raw)))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidArgument(format!("header {:?} has no name", raw)));
    }
    Ok(Header::new(name, value.trim()))
}
