//! Protection spaces: the set of URLs one set of credentials applies to.

use url::Url;

use crate::challenge::Challenge;

/// Scheme, host and port of a URL (RFC6454 origin).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: String,
    host: String,
    port: u16,
}

impl Origin {
    /// Returns the origin of `url`, or `None` for URLs without a host.
    pub fn of(url: &Url) -> Option<Self> {
        Some(Self {
            scheme: url.scheme().to_ascii_lowercase(),
            host: url.host_str()?.to_ascii_lowercase(),
            port: url.port_or_known_default()?,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// True if `url` has the same host and port, regardless of URL scheme.
    pub fn same_endpoint(&self, url: &Url) -> bool {
        Origin::of(url).is_some_and(|o| o.host == self.host && o.port == self.port)
    }
}

/// Where a set of credentials may be presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtectionSpace {
    /// RFC7617 realm: origin plus the directory of the challenged URL.
    Realm {
        origin: Origin,
        path_prefix: String,
        realm: String,
    },
    /// Credentials obtained from an IVOA login endpoint. `origin` is the
    /// service that issued the challenge.
    Login { origin: Origin, login_url: Url },
}

impl ProtectionSpace {
    /// Realm space for a challenge received from `url`.
    pub fn realm(url: &Url, realm: &str) -> Option<Self> {
        Some(ProtectionSpace::Realm {
            origin: Origin::of(url)?,
            path_prefix: directory_of(url.path()),
            realm: realm.to_string(),
        })
    }

    /// Login-endpoint space for a challenge received from `url`.
    pub fn login(url: &Url, login_url: &Url) -> Option<Self> {
        Some(ProtectionSpace::Login {
            origin: Origin::of(url)?,
            login_url: login_url.clone(),
        })
    }

    pub fn origin(&self) -> &Origin {
        match self {
            ProtectionSpace::Realm { origin, .. } | ProtectionSpace::Login { origin, .. } => origin,
        }
    }

    pub fn realm_name(&self) -> Option<&str> {
        match self {
            ProtectionSpace::Realm { realm, .. } => Some(realm),
            ProtectionSpace::Login { .. } => None,
        }
    }

    pub fn login_url(&self) -> Option<&Url> {
        match self {
            ProtectionSpace::Login { login_url, .. } => Some(login_url),
            ProtectionSpace::Realm { .. } => None,
        }
    }

    /// Default URL-domain test.
    ///
    /// Realm spaces cover the same origin at or below the challenged
    /// directory. Login spaces cover the same host and port.
    pub fn contains(&self, url: &Url) -> bool {
        match self {
            ProtectionSpace::Realm {
                origin, path_prefix, ..
            } => Origin::of(url).as_ref() == Some(origin) && url.path().starts_with(path_prefix.as_str()),
            ProtectionSpace::Login { origin, .. } => origin.same_endpoint(url),
        }
    }

    /// True if `challenge`, received from `url`, describes this space for
    /// the scheme named `scheme`.
    ///
    /// Realm spaces match on realm and origin. Login spaces match on the
    /// challenge's `access_url`.
    pub fn matches_challenge(&self, scheme: &str, challenge: &Challenge, url: &Url) -> bool {
        if !challenge.is_scheme(scheme) {
            return false;
        }
        match self {
            ProtectionSpace::Realm { origin, realm, .. } => {
                challenge.realm() == Some(realm.as_str()) && Origin::of(url).as_ref() == Some(origin)
            }
            ProtectionSpace::Login { login_url, .. } => challenge
                .param("access_url")
                .and_then(|u| Url::parse(u).ok())
                .is_some_and(|u| &u == login_url),
        }
    }
}

fn directory_of(path: &str) -> String {
    match path.rfind('/') {
        Some(i) => path[..=i].to_string(),
        None => "/".to_string(),
    }
}
