//! HTTP 3xx redirect policy.
//!
//! A [`Redirector`] decides whether a response is a redirect to be followed
//! and, if so, where to. It does not send requests; the manager re-runs
//! authentication negotiation against the returned URL.

use log::debug;
use url::Url;

use crate::config::{DEFAULT_REDIRECT_CODES, HEADER_LOCATION};
use crate::error_handling::RedirectError;
use crate::http::HttpResponse;

/// Which scheme changes a redirect may make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolCheck {
    /// Reject `https` to anything other than `https`.
    #[default]
    ForbidDowngrade,
    /// Reject any change of URL scheme.
    SameProtocol,
    /// Accept any target scheme.
    AllowAll,
}

impl ProtocolCheck {
    fn permits(self, from: &str, to: &str) -> bool {
        match self {
            ProtocolCheck::ForbidDowngrade => !from.eq_ignore_ascii_case("https") || to.eq_ignore_ascii_case("https"),
            ProtocolCheck::SameProtocol => from.eq_ignore_ascii_case(to),
            ProtocolCheck::AllowAll => true,
        }
    }
}

/// Redirect-following policy.
///
/// # Examples
///
/// ```
/// use vo_auth::Redirector;
///
/// let see_other_only = Redirector::default().with_codes(&[303]);
/// assert!(see_other_only.follows(303));
/// assert!(!see_other_only.follows(302));
/// assert!(!Redirector::no_redirect().follows(302));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirector {
    codes: Vec<u16>,
    protocol_check: ProtocolCheck,
}

impl Default for Redirector {
    fn default() -> Self {
        Self {
            codes: DEFAULT_REDIRECT_CODES.to_vec(),
            protocol_check: ProtocolCheck::default(),
        }
    }
}

impl Redirector {
    /// A redirector that never follows anything.
    pub fn no_redirect() -> Self {
        Self {
            codes: Vec::new(),
            protocol_check: ProtocolCheck::default(),
        }
    }

    /// Replaces the set of status codes treated as redirects.
    pub fn with_codes(mut self, codes: &[u16]) -> Self {
        self.codes = codes.to_vec();
        self
    }

    /// Replaces the protocol change policy.
    pub fn with_protocol_check(mut self, check: ProtocolCheck) -> Self {
        self.protocol_check = check;
        self
    }

    /// True if `status` is one of the codes this redirector follows.
    pub fn follows(&self, status: u16) -> bool {
        self.codes.contains(&status)
    }

    pub fn protocol_check(&self) -> ProtocolCheck {
        self.protocol_check
    }

    /// Determines the redirect target of a response.
    ///
    /// A relative `Location` is resolved against the response URL.
    ///
    /// # Arguments
    ///
    /// * `response` - A received response
    ///
    /// # Returns
    ///
    /// `Ok(None)` if the status is not a followed redirect code.
    ///
    /// # Errors
    ///
    /// Returns `RedirectError` if the `Location` header is missing or not a
    /// URL, or if the target's scheme is refused by the protocol check.
    pub fn get_redirect_url(&self, response: &HttpResponse) -> Result<Option<Url>, RedirectError> {
        let status = response.status();
        if !self.follows(status) {
            return Ok(None);
        }
        let url = response.url();

        let location = match response.headers().get(HEADER_LOCATION) {
            Some(value) => value.to_str().map_err(|_| RedirectError::MalformedLocation {
                url: url.clone(),
                status,
                location: String::from_utf8_lossy(value.as_bytes()).into_owned(),
            })?,
            None => {
                return Err(RedirectError::MissingLocation {
                    url: url.clone(),
                    status,
                })
            }
        };

        let target = url.join(location.trim()).map_err(|_| RedirectError::MalformedLocation {
            url: url.clone(),
            status,
            location: location.to_string(),
        })?;

        if !self.protocol_check.permits(url.scheme(), target.scheme()) {
            return Err(RedirectError::ProtocolDowngrade {
                url: url.clone(),
                from_scheme: url.scheme().to_string(),
                to_scheme: target.scheme().to_string(),
                target,
            });
        }

        debug!("HTTP {status} redirect {url} -> {target}");
        Ok(Some(target))
    }
}
