//! User interaction for credential acquisition.

use std::fmt;

use log::warn;
use url::Url;

/// A username and password pair.
///
/// The password is never shown by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct UserPass {
    username: String,
    password: String,
}

impl UserPass {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for UserPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPass")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// What a scheme tells the user when asking for credentials.
#[derive(Debug, Clone)]
pub struct CredentialRequest<'a> {
    /// Auth-scheme name, e.g. `Basic`
    pub scheme: &'a str,
    /// Realm announced by the challenge, if any
    pub realm: Option<&'a str>,
    /// Resource that demanded authentication
    pub url: &'a Url,
    /// Login endpoint the credentials will be sent to, if not `url` itself
    pub login_url: Option<&'a Url>,
}

impl fmt::Display for CredentialRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} login", self.scheme)?;
        if let Some(realm) = self.realm {
            write!(f, " for realm \"{realm}\"")?;
        }
        write!(f, " at {}", self.login_url.unwrap_or(self.url))
    }
}

/// Source of credentials and sink for user-facing messages.
///
/// Implementations may block (e.g. on a terminal or dialog prompt).
pub trait UserInterface: Send + Sync {
    /// Asks for a username and password; `None` means the user declined.
    fn acquire_credentials(&self, request: &CredentialRequest<'_>) -> Option<UserPass>;

    /// True if the user can be asked again after a failed attempt.
    fn can_retry(&self) -> bool;

    /// Shows a message to the user.
    fn message(&self, lines: &[String]);
}

/// Non-interactive [`UserInterface`] that always offers the same credentials.
///
/// Retrying would only resend the same credentials, so `can_retry` is false.
/// Messages go to the log.
#[derive(Debug, Clone, Default)]
pub struct FixedUserInterface {
    credentials: Option<UserPass>,
}

impl FixedUserInterface {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Some(UserPass::new(username, password)),
        }
    }

    /// A user interface that declines every request.
    pub fn anonymous() -> Self {
        Self { credentials: None }
    }
}

impl UserInterface for FixedUserInterface {
    fn acquire_credentials(&self, _request: &CredentialRequest<'_>) -> Option<UserPass> {
        self.credentials.clone()
    }

    fn can_retry(&self) -> bool {
        false
    }

    fn message(&self, lines: &[String]) {
        for line in lines {
            warn!("{line}");
        }
    }
}
