//! Logger initialization.
//!
//! Negotiation logs go through `env_logger`, either as coloured lines for a
//! terminal or as JSON lines for collection.

use std::io::Write;

use colored::*;
use log::{Level, LevelFilter, Record};
use serde_json::json;

use crate::config::{AuthConfig, LogFormat};
use crate::error_handling::InitializationError;

/// HTTP stack modules and the most verbose level they may log at.
const QUIET_MODULES: &[(&str, LevelFilter)] = &[
    ("reqwest", LevelFilter::Info),
    ("hyper", LevelFilter::Info),
    ("hyper_util", LevelFilter::Info),
    ("rustls", LevelFilter::Warn),
    ("cookie_store", LevelFilter::Warn),
];

/// Initializes the logger from an `AuthConfig`'s level and format.
///
/// `RUST_LOG` is read first; the configured level then applies globally and
/// to this crate, while the HTTP stack stays at `Info` or above.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger is already set.
///
/// # Examples
///
/// ```bash
/// # Trace negotiation but keep reqwest quiet
/// RUST_LOG=vo_auth=debug,reqwest=warn my_vo_client
/// ```
pub fn init_logger(config: &AuthConfig) -> Result<(), InitializationError> {
    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
}

/// Same as [`init_logger`] with an explicit level and format.
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    colored::control::set_override(true);

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    for (module, ceiling) in QUIET_MODULES {
        builder.filter_module(module, (*ceiling).min(level));
    }
    builder.filter_module(env!("CARGO_CRATE_NAME"), level);

    match format {
        LogFormat::Json => builder.format(|buf, record| writeln!(buf, "{}", json_line(record))),
        LogFormat::Plain => builder.format(|buf, record| writeln!(buf, "{}", plain_line(record))),
    };

    builder.try_init().map_err(InitializationError::from)?;
    Ok(())
}

fn json_line(record: &Record<'_>) -> String {
    json!({
        "ts": chrono::Utc::now().timestamp_millis(),
        "level": record.level().as_str(),
        "target": record.target(),
        "msg": record.args().to_string(),
    })
    .to_string()
}

fn plain_line(record: &Record<'_>) -> String {
    let level = record.level().as_str();
    let level = match record.level() {
        Level::Error => level.red(),
        Level::Warn => level.yellow(),
        Level::Info => level.green(),
        Level::Debug => level.blue(),
        Level::Trace => level.purple(),
    };
    format!(
        "{} {} [{}] {}",
        chrono::Local::now().format("%H:%M:%S%.3f"),
        short_target(record.target()).cyan(),
        level,
        record.args()
    )
}

/// Drops the crate prefix so negotiation logs read `manager::negotiate`.
fn short_target(target: &str) -> &str {
    target
        .strip_prefix(env!("CARGO_CRATE_NAME"))
        .and_then(|rest| rest.strip_prefix("::"))
        .unwrap_or(target)
}
