//! Authcheck probing (SSO_next).
//!
//! An authcheck endpoint behaves like the rest of its service, except that
//! where anonymous and authenticated access are both allowed, a 200
//! response to anonymous access carries a challenge. A successful
//! authenticated response should name the user in `X-VO-Authenticated`.

use log::{debug, info, warn};
use reqwest::Method;
use url::Url;

use super::{AuthConnection, AuthManager, AuthStatus, AuthType};
use crate::challenge::challenges_from_headers;
use crate::config::{is_auth_failure, is_success, HEADER_VO_AUTHENTICATED};
use crate::error_handling::Result;
use crate::http::HttpRequest;

impl AuthManager {
    /// Probes an authcheck endpoint and establishes authentication for it
    /// if needed or requested.
    ///
    /// An anonymous request is made first, without following redirects.
    /// Its status classifies the endpoint: 401/403 is `Required`, 2xx is
    /// `Optional` if a challenge came with it and `None` otherwise, and any
    /// other status is `Unknown` (returned immediately). If challenges were
    /// received and authentication is required or `force_login` is set,
    /// negotiation proceeds as for [`connect`](Self::connect).
    ///
    /// # Arguments
    ///
    /// * `url` - Authcheck endpoint
    /// * `is_head` - Use `HEAD` rather than `GET`
    /// * `force_login` - Discard cached contexts answering the received
    ///   challenges so the user is asked again, even when anonymous access
    ///   would succeed
    ///
    /// # Errors
    ///
    /// Transport and credential acquisition errors. An unsupported scheme
    /// is logged, not raised.
    pub fn authcheck(&self, url: &Url, is_head: bool, force_login: bool) -> Result<AuthStatus> {
        if !matches!(url.scheme(), "http" | "https") {
            return Ok(AuthStatus::NO_AUTH);
        }
        let connector = move |request: &mut HttpRequest| {
            if is_head {
                request.set_method(Method::HEAD);
            }
        };

        let check = self.attempt(url, &connector, None)?;
        let status = check.status();
        let challenges = challenges_from_headers(check.response().headers());
        drop(check);

        let auth_type = if is_auth_failure(status) {
            AuthType::Required
        } else if is_success(status) {
            if challenges.is_empty() {
                AuthType::None
            } else {
                AuthType::Optional
            }
        } else {
            return Ok(AuthStatus::new(AuthType::Unknown));
        };
        info!("Initial authcheck connection to {url}: {status}");

        if challenges.is_empty() || !(auth_type == AuthType::Required || force_login) {
            return Ok(AuthStatus::new(auth_type));
        }

        if force_login {
            let removed = self.cache.evict_matching(&challenges, url);
            debug!("Forced login discarded {removed} cached context(s) for {url}");
        }

        let mut established: Option<AuthConnection> = None;
        if let Some(context) = self.cache.find_challenge_context(&challenges, url) {
            let retry = self.attempt(url, &connector, Some(&context))?;
            if self.assess_attempt(&context, &retry) {
                established = Some(retry);
            }
        }

        if established.is_none() {
            match self.preferred_context_factory(&challenges, url) {
                None => warn!("No supported auth-schemes in WWW-Authenticate from {url}"),
                Some(factory) => {
                    if let Some(ui) = self.user_interface() {
                        established =
                            Some(self.connect_with_challenge(url, &connector, &factory, ui.as_ref())?);
                    }
                }
            }
        }

        Ok(match established {
            Some(aconn) => {
                let is_authenticated = is_success(aconn.status())
                    && aconn.context().is_some_and(|c| c.has_credentials());
                let auth_id = aconn
                    .response()
                    .header_str(HEADER_VO_AUTHENTICATED)
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string);
                AuthStatus::authenticated(auth_type, is_authenticated, auth_id)
            }
            None => AuthStatus::new(auth_type),
        })
    }
}
