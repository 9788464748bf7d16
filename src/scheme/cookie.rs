//! IVOA SSO `ivoa_cookie` scheme.
//!
//! The username and password are POSTed as a form to the challenge's
//! `access_url`; the session cookies set by the response are then sent to
//! every URL they match.

use std::fmt;

use anyhow::anyhow;
use cookie_store::CookieStore;
use log::{debug, info};
use reqwest::header::HeaderValue;
use reqwest::Method;
use url::Url;

use super::{ContextFactory, ProtectionSpace};
use crate::challenge::Challenge;
use crate::config::{HEADER_COOKIE, HEADER_SET_COOKIE};
use crate::error_handling::{AuthError, Result};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::ui::UserPass;

pub(super) const SCHEME_NAME: &str = "ivoa_cookie";

pub(super) fn login(
    factory: &ContextFactory,
    credentials: &UserPass,
    transport: &dyn Transport,
) -> Result<CookieContext> {
    let space = factory.protection_space().clone();
    let login_url = space
        .login_url()
        .cloned()
        .ok_or_else(|| AuthError::credentials(SCHEME_NAME, anyhow!("challenge has no login endpoint")))?;

    let mut request = HttpRequest::new(Method::POST, login_url.clone());
    request.set_form(&[
        ("username", credentials.username()),
        ("password", credentials.password()),
    ]);
    info!("Logging in to {} as {}", login_url, credentials.username());

    let response = transport.execute(request)?;
    if !response.is_success() {
        return Err(AuthError::LoginStatus {
            url: response.url().clone(),
            status: response.status(),
        });
    }

    let store = cookies_from(&response);
    if store.iter_unexpired().next().is_none() {
        return Err(AuthError::credentials(
            SCHEME_NAME,
            anyhow!("login response from {} set no cookies", response.url()),
        ));
    }
    Ok(CookieContext {
        space,
        username: credentials.username().to_string(),
        store,
    })
}

fn cookies_from(response: &HttpResponse) -> CookieStore {
    let mut store = CookieStore::default();
    for value in response.headers().get_all(HEADER_SET_COOKIE) {
        let Ok(text) = value.to_str() else {
            continue;
        };
        if let Err(e) = store.parse(text, response.url()) {
            debug!("Ignoring Set-Cookie from {}: {}", response.url(), e);
        }
    }
    store
}

/// Session cookies obtained from a login endpoint.
pub struct CookieContext {
    space: ProtectionSpace,
    username: String,
    store: CookieStore,
}

impl CookieContext {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn protection_space(&self) -> &ProtectionSpace {
        &self.space
    }

    fn pairs_for(&self, url: &Url) -> Vec<(String, String)> {
        self.store
            .get_request_values(url)
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    pub(crate) fn is_url_domain(&self, url: &Url) -> bool {
        !self.store.matches(url).is_empty()
    }

    pub(crate) fn is_challenge_domain(&self, challenge: &Challenge, url: &Url) -> bool {
        self.space.matches_challenge(SCHEME_NAME, challenge, url)
    }

    pub(crate) fn is_expired(&self) -> bool {
        self.store.iter_unexpired().next().is_none()
    }

    pub(crate) fn apply(&self, request: &mut HttpRequest) {
        let pairs = self.pairs_for(request.url());
        if pairs.is_empty() {
            return;
        }
        let header = pairs
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        if let Ok(mut value) = HeaderValue::from_str(&header) {
            value.set_sensitive(true);
            request.headers_mut().insert(HEADER_COOKIE, value);
        }
    }

    pub(crate) fn cli_args(&self, url: &Url, reveal: bool) -> Vec<String> {
        let pairs = self.pairs_for(url);
        if pairs.is_empty() {
            return Vec::new();
        }
        let cookies = pairs
            .iter()
            .map(|(name, value)| {
                if reveal {
                    format!("{name}={value}")
                } else {
                    format!("{name}=...")
                }
            })
            .collect::<Vec<_>>()
            .join("; ");
        vec!["-b".to_string(), cookies]
    }
}

impl fmt::Debug for CookieContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieContext")
            .field("space", &self.space)
            .field("username", &self.username)
            .field("cookies", &self.store.iter_any().count())
            .finish()
    }
}
