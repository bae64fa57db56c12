//! Logger initialization.
//!
//! The library only emits through the `log` facade; binaries call
//! [`init_logger_with`] to install `env_logger` on stderr so that stdout stays
//! free for captured-request output.

use std::io::{IsTerminal, Write};

use colored::*;
use env_logger::fmt::Formatter;
use log::{Level, LevelFilter, Record};

use crate::config::LogFormat;
use crate::error_handling::InitializationError;

/// Crates whose own logging is held back regardless of `level`.
const QUIET_MODULES: &[(&str, LevelFilter)] = &[
    ("reqwest", LevelFilter::Info),
    ("hyper", LevelFilter::Info),
    ("hyper_util", LevelFilter::Info),
    ("rustls", LevelFilter::Warn),
    ("tungstenite", LevelFilter::Warn),
    ("tokio_tungstenite", LevelFilter::Warn),
];

/// Initializes the logger with the specified level and format.
///
/// The logger reads `RUST_LOG` first; the `level` argument then overrides the
/// global filter and this crate's own filter. Transport crates stay at
/// `Info`/`Warn` so `--log-level trace` remains readable. Colors are used
/// only when stderr is a terminal.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger is already installed.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=requestrepo=debug requestrepo watch
/// requestrepo --log-level warn --log-format json list
/// ```
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    colored::control::set_override(std::io::stderr().is_terminal());

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    for (module, cap) in QUIET_MODULES {
        builder.filter_module(module, (*cap).min(level));
    }
    builder.filter_module(env!("CARGO_CRATE_NAME"), level);

    match format {
        LogFormat::Json => builder.format(write_json),
        LogFormat::Plain => builder.format(write_plain),
    };

    builder.try_init()?;
    Ok(())
}

/// One JSON object per line: `ts` (unix millis), `level`, `target`, `msg`.
fn write_json(buf: &mut Formatter, record: &Record<'_>) -> std::io::Result<()> {
    let line = serde_json::json!({
        "ts": chrono::Utc::now().timestamp_millis(),
        "level": record.level().as_str(),
        "target": record.target(),
        "msg": record.args().to_string(),
    });
    writeln!(buf, "{}", line)
}

/// `HH:MM:SS LEVEL target: message`, colored by level.
fn write_plain(buf: &mut Formatter, record: &Record<'_>) -> std::io::Result<()> {
    let label = format!("{:<5}", record.level());
    let label = match record.level() {
        Level::Error => label.red().bold(),
        Level::Warn => label.yellow(),
        Level::Info => label.green(),
        Level::Debug => label.blue(),
        Level::Trace => label.purple(),
    };
    writeln!(
        buf,
        "{} {} {}: {}",
        chrono::Local::now().format("%H:%M:%S").to_string().dimmed(),
        label,
        record.target().cyan(),
        record.args()
    )
}
