//! Error type definitions.
//!
//! This module defines all error types used throughout the crate.

use log::SetLoggerError;
use thiserror::Error;
use url::Url;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    /// The configuration was rejected.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigValidationError),
}

/// A configuration value that failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {field}: {message}")]
pub struct ConfigValidationError {
    /// Name of the offending field or environment variable
    pub field: String,
    /// What is wrong with it
    pub message: String,
}

impl ConfigValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Reasons a redirect response cannot be followed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RedirectError {
    /// Redirect status without a `Location` header.
    #[error("HTTP {status} redirect from {url} has no Location header")]
    MissingLocation { url: Url, status: u16 },

    /// `Location` header that does not resolve to a URL.
    #[error("HTTP {status} redirect from {url} has malformed Location \"{location}\"")]
    MalformedLocation {
        url: Url,
        status: u16,
        location: String,
    },

    /// Redirect rejected by the protocol policy, e.g. https to http.
    #[error("refusing {from_scheme} to {to_scheme} redirect from {url} to {target}")]
    ProtocolDowngrade {
        url: Url,
        target: Url,
        from_scheme: String,
        to_scheme: String,
    },
}

/// A scheme's rejection of a challenge it would otherwise handle.
///
/// This is recovered locally: the scheme is treated as not applying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("bad {scheme} challenge: {reason}")]
pub struct BadChallenge {
    pub scheme: String,
    pub reason: String,
}

impl BadChallenge {
    pub fn new(scheme: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of the underlying HTTP transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Error reported by reqwest (connect, TLS, timeout, body).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The request could not be assembled, e.g. unusable client key material.
    #[error("cannot build request for {url}: {reason}")]
    Request { url: Url, reason: String },

    /// I/O error while reading a response body.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by authentication negotiation.
///
/// Authentication failures (401/403 after presenting credentials) are not
/// errors; they come back as responses for the caller to inspect.
#[derive(Error, Debug)]
pub enum AuthError {
    /// 401 response carrying no parsable challenge (RFC7235 section 3.1).
    #[error("401 with no WWW-Authenticate challenges: {url}")]
    MissingChallenge { url: Url },

    /// Challenges were present but no configured scheme understands any of them.
    #[error("No supported auth-schemes in WWW-Authenticate: {url}")]
    NoSupportedScheme { url: Url },

    /// Redirect could not be followed.
    #[error("Redirect error: {0}")]
    Redirect(#[from] RedirectError),

    /// Transport-level failure.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Credential material could not be obtained from a login endpoint.
    #[error("Failed to acquire {scheme} credentials: {source:#}")]
    CredentialAcquisition {
        scheme: String,
        #[source]
        source: anyhow::Error,
    },

    /// Login endpoint answered with a non-2xx status.
    #[error("Login endpoint {url} returned HTTP {status}")]
    LoginStatus { url: Url, status: u16 },

    /// Login endpoint response exceeded the size limit.
    #[error("Login response from {url} exceeds {limit} bytes")]
    PayloadTooLarge { url: Url, limit: usize },

    /// Redirect chain longer than the configured limit.
    #[error("Too many redirects (more than {limit}) starting from {url}")]
    TooManyRedirects { url: Url, limit: usize },

    /// Final response was not successful where a body was required.
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: Url, status: u16 },
}

impl AuthError {
    pub(crate) fn credentials(scheme: &str, source: anyhow::Error) -> Self {
        AuthError::CredentialAcquisition {
            scheme: scheme.to_string(),
            source,
        }
    }
}

impl From<std::io::Error> for AuthError {
    fn from(e: std::io::Error) -> Self {
        AuthError::Transport(TransportError::Io(e))
    }
}
