//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `requestrepo` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - Printing captured requests as JSON lines on stdout
//!
//! All core functionality is implemented in the library crate.

use std::io::Write;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use requestrepo::config::cli::{parse_header, Cli, Command, DnsAction};
use requestrepo::initialization::init_logger_with;
use requestrepo::{CancellationToken, CapturedRequest, DnsType, Requestrepo, ResponseUpdate};

#[tokio::main]
async fn main() -> Result<()> {
    // A .env next to the working directory may carry REQUESTREPO_TOKEN
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let cli = Cli::parse();

    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    if let Err(e) = run(cli).await {
        eprintln!("requestrepo error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut client = Requestrepo::new(cli.client_config())
        .await
        .context("Failed to start session")?;

    match cli.command {
        Command::Token => {
            println!("{}", client.domain());
            println!("{}", client.token());
        }
        Command::List { limit, offset } => {
            let requests = client.list_requests(limit, offset).await?;
            let mut stdout = std::io::stdout().lock();
            for request in &requests {
                print_request(&mut stdout, request)?;
            }
        }
        Command::Watch { .. } => {
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_signal.cancel();
                }
            });

            info!("Watching {} (Ctrl-C to stop)", client.domain());
            client
                .await_requests(&cancel, |request| {
                    let mut stdout = std::io::stdout().lock();
                    print_request(&mut stdout, &request)
                })
                .await?;
            client.close().await;
        }
        Command::Delete { id } => {
            if client.delete_request(&id).await? {
                println!("deleted {}", id);
            } else {
                anyhow::bail!("no request with id {}", id);
            }
        }
        Command::Clear => {
            client.delete_all_requests().await?;
            println!("deleted all requests for {}", client.domain());
        }
        Command::Dns { action } => match action {
            None => {
                for record in client.dns().await? {
                    println!(
                        "{}.{}\t{}\t{}",
                        record.domain,
                        client.domain(),
                        record.record_type,
                        record.value
                    );
                }
            }
            Some(DnsAction::Add {
                domain,
                record_type,
                value,
            }) => {
                let record_type: DnsType = record_type.parse()?;
                if !client.add_dns(&domain, record_type, &value).await? {
                    anyhow::bail!("service refused the DNS update");
                }
            }
            Some(DnsAction::Remove {
                domain,
                record_type,
            }) => {
                let record_type = record_type
                    .map(|t| t.parse::<DnsType>())
                    .transpose()?;
                if !client.remove_dns(&domain, record_type).await? {
                    anyhow::bail!("no matching DNS record for {}", domain);
                }
            }
        },
        Command::Response {
            status,
            body,
            headers,
        } => {
            let mut update = ResponseUpdate::default();
            if let Some(status) = status {
                update = update.status_code(status);
            }
            if let Some(body) = body {
                update = update.body(body);
            }
            if !headers.is_empty() {
                let headers = headers
                    .iter()
                    .map(|h| parse_header(h))
                    .collect::<requestrepo::Result<Vec<_>>>()?;
                update = update.headers(headers);
            }

            if !update.is_empty() && !client.update_response(update).await? {
                anyhow::bail!("service refused the response update");
            }

            let response = client.response().await?;
            println!("HTTP {}", response.status_code);
            for header in &response.headers {
                println!("{}: {}", header.header, header.value);
            }
            println!();
            println!("{}", String::from_utf8_lossy(&response.raw));
        }
    }
    Ok(())
}

fn print_request(out: &mut impl Write, request: &CapturedRequest) -> Result<()> {
    serde_json::to_writer(&mut *out, request).context("Failed to encode request")?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
