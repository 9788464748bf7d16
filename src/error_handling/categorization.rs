//! Status code categorization.
//!
//! This module turns response status codes into the short messages shown
//! to a user whose authentication attempt failed.

/// Categories of response relevant to authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    /// 2xx
    Success,
    /// 3xx
    Redirect,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// Anything else
    Other,
}

/// Categorizes an HTTP status code.
///
/// # Arguments
///
/// * `status` - The numeric HTTP status code
///
/// # Returns
///
/// The `StatusCategory` the code belongs to.
pub fn categorize_status(status: u16) -> StatusCategory {
    match status {
        200..=299 => StatusCategory::Success,
        300..=399 => StatusCategory::Redirect,
        401 => StatusCategory::Unauthorized,
        403 => StatusCategory::Forbidden,
        404 => StatusCategory::NotFound,
        _ => StatusCategory::Other,
    }
}

/// Builds a one-line message describing an authentication failure.
///
/// The message starts with the status code, followed by its reason phrase
/// and a hint at what the failure means for the user, e.g.
/// `"401: Unauthorized - bad credentials"`.
///
/// # Arguments
///
/// * `status` - The status code of the failed response
pub fn auth_failure_message(status: u16) -> String {
    let reason = reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status Code");
    match categorize_status(status) {
        StatusCategory::Unauthorized => format!("{status}: {reason} - bad credentials"),
        StatusCategory::Forbidden => format!("{status}: {reason} - insufficient privileges"),
        _ => format!("{status}: {reason}"),
    }
}
