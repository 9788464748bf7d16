//! HTTP header name constants.
//!
//! Header names are kept lower-case so they can be used directly with
//! `HeaderName::from_static`.

/// RFC7235 challenge header carried by 401/403 (and SSO_next 200) responses
pub const HEADER_WWW_AUTHENTICATE: &str = "www-authenticate";
/// RFC7235 credentials header on outgoing requests
pub const HEADER_AUTHORIZATION: &str = "authorization";
/// Authenticated identity header defined by the SSO_next convention
pub const HEADER_VO_AUTHENTICATED: &str = "x-vo-authenticated";
/// Redirect target header
pub const HEADER_LOCATION: &str = "location";
/// Cookie header on outgoing requests
pub const HEADER_COOKIE: &str = "cookie";
/// Cookie-setting header on login responses
pub const HEADER_SET_COOKIE: &str = "set-cookie";
