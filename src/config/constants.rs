//! Configuration constants.
//!
//! This module defines the constants used throughout the crate, including
//! timeouts, size limits, redirect handling and IVOA identifiers.

use std::time::Duration;

// Network operation timeouts
/// Per-request HTTP timeout in seconds
/// Login endpoints for certificate issue can be slow, so this is generous
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Default HTTP timeout as a `Duration`.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(HTTP_TIMEOUT_SECS);

/// Default User-Agent string for HTTP requests.
///
/// Users can override this via `AuthConfig::user_agent` or the
/// `VO_AUTH_USER_AGENT` environment variable.
pub const DEFAULT_USER_AGENT: &str = concat!("vo_auth/", env!("CARGO_PKG_VERSION"));

// Redirect handling
/// Maximum number of redirect hops to follow
/// Prevents infinite redirect loops and excessive request chains
pub const MAX_REDIRECT_HOPS: usize = 20;

/// Status codes that are followed as redirects by the default redirector.
pub const DEFAULT_REDIRECT_CODES: &[u16] = &[301, 302, 303, 307, 308];

// Response and body size limits
/// Maximum login endpoint response body size in bytes (1MB)
/// A PEM certificate with key is a few KB; anything far larger is refused
pub const MAX_LOGIN_RESPONSE_SIZE: usize = 1024 * 1024;

// Credential lifetimes
/// Seconds before certificate expiry at which an X.509 context stops being offered
pub const X509_EXPIRY_MARGIN_SECS: i64 = 60;

// IVOA single sign-on
/// Standard identifier for username/password login over TLS (SSO_next).
pub const IVOA_STANDARD_TLS_WITH_PASSWORD: &str = "ivo://ivoa.net/sso#tls-with-password";

// HTTP status codes (for clarity and consistency)
pub const HTTP_STATUS_UNAUTHORIZED: u16 = 401;
pub const HTTP_STATUS_FORBIDDEN: u16 = 403;

/// Returns true for the status codes that signal an authentication failure.
pub fn is_auth_failure(status: u16) -> bool {
    status == HTTP_STATUS_UNAUTHORIZED || status == HTTP_STATUS_FORBIDDEN
}

/// Returns true for 2xx status codes.
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}
