//! Configuration types.
//!
//! This module defines the enums and structs used to configure an
//! `AuthManager` and the logging around it.

use std::env;
use std::str::FromStr;

use strum_macros::{Display, EnumString};

use crate::config::constants::{
    DEFAULT_USER_AGENT, HTTP_TIMEOUT_SECS, MAX_LOGIN_RESPONSE_SIZE, MAX_REDIRECT_HOPS,
};
use crate::error_handling::ConfigValidationError;
use crate::scheme::SchemeKind;

/// Logging level for the crate.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Authentication configuration.
///
/// Can be built programmatically, starting from `Default`, or read from
/// `VO_AUTH_*` environment variables with [`AuthConfig::from_env`].
///
/// # Examples
///
/// ```
/// use vo_auth::AuthConfig;
///
/// let config = AuthConfig {
///     timeout_seconds: 10,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// Authentication schemes in order of preference
    pub schemes: Vec<SchemeKind>,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// HTTP User-Agent header value
    pub user_agent: String,

    /// Maximum number of redirects followed by one `connect` call
    pub max_redirects: usize,

    /// Maximum accepted size of a login endpoint response body
    pub max_login_response_size: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            schemes: SchemeKind::default_preference(),
            timeout_seconds: HTTP_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: MAX_REDIRECT_HOPS,
            max_login_response_size: MAX_LOGIN_RESPONSE_SIZE,
        }
    }
}

impl AuthConfig {
    /// Builds a configuration from `VO_AUTH_*` environment variables.
    ///
    /// Unset variables keep their default values:
    /// - `VO_AUTH_LOG_LEVEL` (error, warn, info, debug, trace)
    /// - `VO_AUTH_LOG_FORMAT` (plain, json)
    /// - `VO_AUTH_SCHEMES` (comma-separated scheme names, most preferred first)
    /// - `VO_AUTH_TIMEOUT_SECS`
    /// - `VO_AUTH_USER_AGENT`
    /// - `VO_AUTH_MAX_REDIRECTS`
    ///
    /// # Errors
    ///
    /// Returns a `ConfigValidationError` naming the offending variable if a
    /// value cannot be parsed, or if the resulting configuration is invalid.
    pub fn from_env() -> Result<Self, ConfigValidationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    ///
    /// This is what [`AuthConfig::from_env`] delegates to; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("VO_AUTH_LOG_LEVEL") {
            config.log_level = parse_var("VO_AUTH_LOG_LEVEL", &v)?;
        }
        if let Some(v) = lookup("VO_AUTH_LOG_FORMAT") {
            config.log_format = parse_var("VO_AUTH_LOG_FORMAT", &v)?;
        }
        if let Some(v) = lookup("VO_AUTH_SCHEMES") {
            config.schemes = v
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| parse_var("VO_AUTH_SCHEMES", name))
                .collect::<Result<Vec<SchemeKind>, _>>()?;
        }
        if let Some(v) = lookup("VO_AUTH_TIMEOUT_SECS") {
            config.timeout_seconds = parse_var("VO_AUTH_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("VO_AUTH_USER_AGENT") {
            config.user_agent = v;
        }
        if let Some(v) = lookup("VO_AUTH_MAX_REDIRECTS") {
            config.max_redirects = parse_var("VO_AUTH_MAX_REDIRECTS", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for values that would make the manager unusable.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigValidationError` for the first invalid field found.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.schemes.is_empty() {
            return Err(ConfigValidationError::new(
                "schemes",
                "at least one authentication scheme must be configured",
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigValidationError::new(
                "timeout_seconds",
                "timeout must be greater than 0",
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigValidationError::new(
                "user_agent",
                "user agent must not be empty",
            ));
        }
        if self.max_login_response_size == 0 {
            return Err(ConfigValidationError::new(
                "max_login_response_size",
                "login response size limit must be greater than 0",
            ));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigValidationError> {
    value.trim().parse::<T>().map_err(|_| {
        ConfigValidationError::new(key, format!("unrecognised value '{}'", value.trim()))
    })
}
