//! Results of an authcheck request.

use std::fmt;

use serde::Serialize;
use strum_macros::Display;

/// How a service treats anonymous access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AuthType {
    /// Anonymous access succeeds and no challenge is offered.
    None,
    /// Anonymous access succeeds but a challenge is offered.
    Optional,
    /// Anonymous access is refused (401/403).
    Required,
    /// The authcheck request gave some other status.
    Unknown,
}

/// Authentication state established for an authcheck endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    auth_type: AuthType,
    is_authenticated: bool,
    auth_id: Option<String>,
}

impl AuthStatus {
    /// Status for a service that needs no authentication.
    pub const NO_AUTH: AuthStatus = AuthStatus {
        auth_type: AuthType::None,
        is_authenticated: false,
        auth_id: None,
    };

    /// Status with no authentication established.
    pub fn new(auth_type: AuthType) -> Self {
        Self {
            auth_type,
            is_authenticated: false,
            auth_id: None,
        }
    }

    pub fn authenticated(auth_type: AuthType, is_authenticated: bool, auth_id: Option<String>) -> Self {
        Self {
            auth_type,
            is_authenticated,
            auth_id,
        }
    }

    pub fn auth_type(&self) -> AuthType {
        self.auth_type
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// Identity reported by the service in `X-VO-Authenticated`, if any.
    pub fn auth_id(&self) -> Option<&str> {
        self.auth_id.as_deref()
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.auth_type)?;
        match (self.is_authenticated, &self.auth_id) {
            (true, Some(id)) => write!(f, ", authenticated as {id}"),
            (true, None) => write!(f, ", authenticated"),
            (false, _) if matches!(self.auth_type, AuthType::Optional | AuthType::Required) => {
                write!(f, ", not authenticated")
            }
            (false, _) => Ok(()),
        }
    }
}
