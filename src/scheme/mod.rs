//! Authentication schemes.
//!
//! A [`SchemeKind`] recognises challenges for one auth-scheme and turns an
//! acceptable challenge into a [`ContextFactory`]. The factory obtains
//! credentials (asking the [`UserInterface`] and, for IVOA login schemes,
//! calling the login endpoint) and wraps them in an [`AuthContext`].
//!
//! Supported schemes:
//! - `ivoa_cookie`: username/password POSTed to a login endpoint that
//!   answers with session cookies
//! - `ivoa_x509`: username/password sent to a login endpoint that answers
//!   with a PEM client certificate and key
//! - `Basic`: RFC7617 username/password on every request

mod basic;
mod cookie;
mod protection;
mod x509;

use log::debug;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use url::Url;

use crate::challenge::Challenge;
use crate::config::{IVOA_STANDARD_TLS_WITH_PASSWORD, MAX_LOGIN_RESPONSE_SIZE};
use crate::context::{AuthContext, ContextKind};
use crate::error_handling::{BadChallenge, Result};
use crate::http::Transport;
use crate::ui::{CredentialRequest, UserInterface};

pub use basic::BasicContext;
pub use cookie::CookieContext;
pub use protection::{Origin, ProtectionSpace};
pub use x509::X509Context;

/// Supported auth-schemes, in default order of preference.
///
/// Parses case-insensitively from the scheme name used in
/// `WWW-Authenticate` (`ivoa_cookie`, `ivoa_x509`, `Basic`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum SchemeKind {
    /// IVOA SSO cookie login
    #[strum(serialize = "ivoa_cookie")]
    Cookie,
    /// IVOA SSO client certificate login
    #[strum(serialize = "ivoa_x509")]
    X509,
    /// RFC7617 Basic
    #[strum(serialize = "Basic")]
    Basic,
}

impl SchemeKind {
    /// Scheme name as it appears in challenges.
    pub fn name(self) -> &'static str {
        match self {
            SchemeKind::Cookie => cookie::SCHEME_NAME,
            SchemeKind::X509 => x509::SCHEME_NAME,
            SchemeKind::Basic => basic::SCHEME_NAME,
        }
    }

    /// All schemes, most preferred first.
    ///
    /// IVOA login schemes come before Basic so that passwords are sent to
    /// a dedicated login endpoint rather than with every request.
    pub fn default_preference() -> Vec<SchemeKind> {
        SchemeKind::iter().collect()
    }

    /// Creates a context factory if this scheme understands `challenge`.
    ///
    /// # Arguments
    ///
    /// * `challenge` - A challenge from a 401 response
    /// * `url` - The URL whose response carried the challenge
    ///
    /// # Returns
    ///
    /// `Ok(None)` if the challenge is for a different scheme.
    ///
    /// # Errors
    ///
    /// Returns `BadChallenge` if the challenge names this scheme but lacks
    /// what the scheme needs (a realm for Basic; a supported `standard_id`
    /// and absolute `access_url` for the IVOA schemes).
    pub fn create_context_factory(
        self,
        challenge: &Challenge,
        url: &Url,
    ) -> std::result::Result<Option<ContextFactory>, BadChallenge> {
        if !challenge.is_scheme(self.name()) {
            return Ok(None);
        }
        let space = match self {
            SchemeKind::Basic => basic::protection_space(challenge, url)?,
            SchemeKind::Cookie | SchemeKind::X509 => login_space(self.name(), challenge, url)?,
        };
        Ok(Some(ContextFactory {
            kind: self,
            challenge: challenge.clone(),
            url: url.clone(),
            space,
            body_limit: MAX_LOGIN_RESPONSE_SIZE,
        }))
    }
}

/// Validates the IVOA SSO parameters of a challenge.
fn login_space(
    scheme: &str,
    challenge: &Challenge,
    url: &Url,
) -> std::result::Result<ProtectionSpace, BadChallenge> {
    let standard_id = challenge.require_param("standard_id")?;
    if standard_id != IVOA_STANDARD_TLS_WITH_PASSWORD {
        return Err(BadChallenge::new(
            scheme,
            format!("unsupported standard_id \"{standard_id}\""),
        ));
    }
    let access_url = challenge.require_param("access_url")?;
    let login_url = Url::parse(access_url)
        .map_err(|e| BadChallenge::new(scheme, format!("bad access_url \"{access_url}\": {e}")))?;
    if !matches!(login_url.scheme(), "http" | "https") {
        return Err(BadChallenge::new(
            scheme,
            format!("access_url \"{access_url}\" is not an HTTP URL"),
        ));
    }
    ProtectionSpace::login(url, &login_url)
        .ok_or_else(|| BadChallenge::new(scheme, format!("challenged URL {url} has no host")))
}

/// Produces contexts for one challenge received from one URL.
#[derive(Debug, Clone)]
pub struct ContextFactory {
    kind: SchemeKind,
    challenge: Challenge,
    url: Url,
    space: ProtectionSpace,
    body_limit: usize,
}

impl ContextFactory {
    /// Caps the size of login endpoint responses.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn scheme(&self) -> SchemeKind {
        self.kind
    }

    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }

    /// URL whose response carried the challenge.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn protection_space(&self) -> &ProtectionSpace {
        &self.space
    }

    pub(crate) fn body_limit(&self) -> usize {
        self.body_limit
    }

    /// Asks the user for credentials and builds a context from them.
    ///
    /// # Returns
    ///
    /// `Ok(None)` if the user declined to supply credentials.
    ///
    /// # Errors
    ///
    /// Login endpoint failures: transport errors, `LoginStatus`,
    /// `PayloadTooLarge` or `CredentialAcquisition`.
    pub fn create_context(
        &self,
        ui: &dyn UserInterface,
        transport: &dyn Transport,
    ) -> Result<Option<AuthContext>> {
        let request = CredentialRequest {
            scheme: self.kind.name(),
            realm: self.challenge.realm(),
            url: &self.url,
            login_url: self.space.login_url(),
        };
        let Some(credentials) = ui.acquire_credentials(&request) else {
            debug!("No credentials supplied for {request}");
            return Ok(None);
        };

        let kind = match self.kind {
            SchemeKind::Basic => ContextKind::Basic(BasicContext::new(self.space.clone(), credentials)),
            SchemeKind::Cookie => ContextKind::Cookie(cookie::login(self, &credentials, transport)?),
            SchemeKind::X509 => ContextKind::X509(x509::login(self, &credentials, transport)?),
        };
        Ok(Some(AuthContext::new(kind)))
    }

    /// Builds a context that carries no credentials but records that this
    /// protection space was deliberately left unauthenticated.
    pub fn create_unauth_context(&self) -> AuthContext {
        AuthContext::anonymous(self.kind, self.space.clone())
    }
}
