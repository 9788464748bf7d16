//! RFC7617 Basic authentication.

use base64::prelude::{Engine as _, BASE64_STANDARD};
use reqwest::header::{HeaderValue, InvalidHeaderValue};
use url::Url;

use super::ProtectionSpace;
use crate::challenge::Challenge;
use crate::config::HEADER_AUTHORIZATION;
use crate::error_handling::BadChallenge;
use crate::http::HttpRequest;
use crate::ui::UserPass;

pub(super) const SCHEME_NAME: &str = "Basic";

pub(super) fn protection_space(challenge: &Challenge, url: &Url) -> Result<ProtectionSpace, BadChallenge> {
    let realm = challenge.require_realm()?;
    ProtectionSpace::realm(url, realm)
        .ok_or_else(|| BadChallenge::new(SCHEME_NAME, format!("challenged URL {url} has no host")))
}

/// `Authorization: Basic ...` value for the given credentials.
pub(crate) fn authorization_value(credentials: &UserPass) -> Result<HeaderValue, InvalidHeaderValue> {
    let token = BASE64_STANDARD.encode(format!(
        "{}:{}",
        credentials.username(),
        credentials.password()
    ));
    let mut value = HeaderValue::from_str(&format!("Basic {token}"))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Username and password sent with every request in a realm.
#[derive(Debug)]
pub struct BasicContext {
    space: ProtectionSpace,
    credentials: UserPass,
}

impl BasicContext {
    pub(crate) fn new(space: ProtectionSpace, credentials: UserPass) -> Self {
        Self { space, credentials }
    }

    pub fn username(&self) -> &str {
        self.credentials.username()
    }

    pub fn protection_space(&self) -> &ProtectionSpace {
        &self.space
    }

    pub(crate) fn is_url_domain(&self, url: &Url) -> bool {
        self.space.contains(url)
    }

    pub(crate) fn is_challenge_domain(&self, challenge: &Challenge, url: &Url) -> bool {
        self.space.matches_challenge(SCHEME_NAME, challenge, url)
    }

    pub(crate) fn apply(&self, request: &mut HttpRequest) {
        if let Ok(value) = authorization_value(&self.credentials) {
            request.headers_mut().insert(HEADER_AUTHORIZATION, value);
        }
    }

    pub(crate) fn cli_args(&self, reveal: bool) -> Vec<String> {
        let user = if reveal {
            format!("{}:{}", self.credentials.username(), self.credentials.password())
        } else {
            self.credentials.username().to_string()
        };
        vec!["-u".to_string(), user]
    }
}
