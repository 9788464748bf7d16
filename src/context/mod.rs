//! Authentication contexts.
//!
//! An [`AuthContext`] is a set of credentials (or the deliberate absence of
//! them) bound to the protection space it was obtained for. Contexts are
//! cheap to clone and compare by identity: two contexts are equal only if
//! one is a clone of the other.

mod cache;
mod describe;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use url::Url;

use crate::challenge::Challenge;
use crate::http::HttpRequest;
use crate::scheme::{BasicContext, CookieContext, ProtectionSpace, SchemeKind, X509Context};

pub use cache::{ContextCache, ContextList};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Scheme-specific context state.
#[derive(Debug)]
pub enum ContextKind {
    Basic(BasicContext),
    Cookie(CookieContext),
    X509(X509Context),
    /// No credentials: the user declined to authenticate for this space.
    Anonymous {
        scheme: SchemeKind,
        space: ProtectionSpace,
    },
}

/// Credentials applicable to a protection space.
#[derive(Clone)]
pub struct AuthContext {
    id: u64,
    kind: Arc<ContextKind>,
}

impl AuthContext {
    pub fn new(kind: ContextKind) -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            kind: Arc::new(kind),
        }
    }

    /// A context without credentials for `space`.
    pub fn anonymous(scheme: SchemeKind, space: ProtectionSpace) -> Self {
        Self::new(ContextKind::Anonymous { scheme, space })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> &ContextKind {
        &self.kind
    }

    pub fn scheme(&self) -> SchemeKind {
        match self.kind() {
            ContextKind::Basic(_) => SchemeKind::Basic,
            ContextKind::Cookie(_) => SchemeKind::Cookie,
            ContextKind::X509(_) => SchemeKind::X509,
            ContextKind::Anonymous { scheme, .. } => *scheme,
        }
    }

    pub fn protection_space(&self) -> &ProtectionSpace {
        match self.kind() {
            ContextKind::Basic(c) => c.protection_space(),
            ContextKind::Cookie(c) => c.protection_space(),
            ContextKind::X509(c) => c.protection_space(),
            ContextKind::Anonymous { space, .. } => space,
        }
    }

    /// False for anonymous contexts.
    pub fn has_credentials(&self) -> bool {
        !matches!(self.kind(), ContextKind::Anonymous { .. })
    }

    /// True if this context should be presented when requesting `url`.
    pub fn is_url_domain(&self, url: &Url) -> bool {
        match self.kind() {
            ContextKind::Basic(c) => c.is_url_domain(url),
            ContextKind::Cookie(c) => c.is_url_domain(url),
            ContextKind::X509(c) => c.is_url_domain(url),
            ContextKind::Anonymous { space, .. } => space.contains(url),
        }
    }

    /// True if this context answers `challenge`, received from `url`.
    pub fn is_challenge_domain(&self, challenge: &Challenge, url: &Url) -> bool {
        match self.kind() {
            ContextKind::Basic(c) => c.is_challenge_domain(challenge, url),
            ContextKind::Cookie(c) => c.is_challenge_domain(challenge, url),
            ContextKind::X509(c) => c.is_challenge_domain(challenge, url),
            ContextKind::Anonymous { scheme, space } => {
                space.matches_challenge(scheme.name(), challenge, url)
            }
        }
    }

    /// True once the credentials can no longer be used.
    pub fn is_expired(&self) -> bool {
        match self.kind() {
            ContextKind::Cookie(c) => c.is_expired(),
            ContextKind::X509(c) => c.is_expired(),
            ContextKind::Basic(_) | ContextKind::Anonymous { .. } => false,
        }
    }

    /// Adds this context's credentials to an outgoing request.
    pub fn apply(&self, request: &mut HttpRequest) {
        match self.kind() {
            ContextKind::Basic(c) => c.apply(request),
            ContextKind::Cookie(c) => c.apply(request),
            ContextKind::X509(c) => c.apply(request),
            ContextKind::Anonymous { .. } => {}
        }
    }

    /// `curl` arguments that would present these credentials for `url`.
    ///
    /// Secrets are elided unless `reveal` is set. Never fails; contexts
    /// with no command-line form give an empty list.
    pub fn describe_as_cli_args(&self, url: &Url, reveal: bool) -> Vec<String> {
        describe::curl_args(self, url, reveal)
    }
}

impl PartialEq for AuthContext {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for AuthContext {}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("id", &self.id)
            .field("scheme", &self.scheme())
            .field("credentials", &self.has_credentials())
            .finish()
    }
}

impl fmt::Display for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ContextKind::Basic(c) => write!(f, "Basic {}", c.username()),
            ContextKind::Cookie(c) => write!(f, "ivoa_cookie {}", c.username()),
            ContextKind::X509(c) => write!(f, "ivoa_x509 {}", c.subject()),
            ContextKind::Anonymous { scheme, .. } => write!(f, "{scheme} (anonymous)"),
        }
    }
}
