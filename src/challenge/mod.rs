//! RFC7235 authentication challenges.
//!
//! A `WWW-Authenticate` header carries one or more challenges, each an
//! auth-scheme name followed by either a `token68` or a list of
//! `name=value` auth-params. This module provides the parsed [`Challenge`]
//! value and the parser that produces it.

mod parser;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use reqwest::header::HeaderMap;

use crate::config::HEADER_WWW_AUTHENTICATE;
use crate::error_handling::BadChallenge;

pub use parser::parse_challenges;

/// A single parsed authentication challenge.
///
/// The scheme name compares case-insensitively. A challenge carrying a
/// `token68` never carries a realm or parameters. Parameter keys are
/// lower-cased and values are stored unescaped.
#[derive(Debug, Clone)]
pub struct Challenge {
    scheme: String,
    realm: Option<String>,
    token68: Option<String>,
    params: BTreeMap<String, String>,
}

impl Challenge {
    /// Creates a challenge with only a scheme name.
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            realm: None,
            token68: None,
            params: BTreeMap::new(),
        }
    }

    /// Creates a challenge in the auth-param form.
    ///
    /// A `realm` key in `params` (any case) is moved into the realm field
    /// unless `realm` is already given. Other keys are lower-cased.
    pub fn with_params<I, K, V>(scheme: impl Into<String>, realm: Option<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut challenge = Self::new(scheme);
        challenge.realm = realm;
        for (key, value) in params {
            let key = key.into().to_ascii_lowercase();
            let value = value.into();
            if key == "realm" {
                if challenge.realm.is_none() {
                    challenge.realm = Some(value);
                }
            } else {
                challenge.params.entry(key).or_insert(value);
            }
        }
        challenge
    }

    /// Creates a challenge in the token68 form.
    pub fn with_token68(scheme: impl Into<String>, token68: impl Into<String>) -> Self {
        let mut challenge = Self::new(scheme);
        challenge.token68 = Some(token68.into());
        challenge
    }

    /// Auth-scheme name as received.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns true if this challenge uses the named scheme (case-insensitive).
    pub fn is_scheme(&self, name: &str) -> bool {
        self.scheme.eq_ignore_ascii_case(name)
    }

    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    pub fn token68(&self) -> Option<&str> {
        self.token68.as_deref()
    }

    /// Auth-params other than the realm, keyed by lower-cased name.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Looks up a parameter by case-insensitive name.
    ///
    /// `realm` is answered from the realm field.
    pub fn param(&self, name: &str) -> Option<&str> {
        let key = name.to_ascii_lowercase();
        if key == "realm" {
            self.realm()
        } else {
            self.params.get(&key).map(String::as_str)
        }
    }

    /// Returns a required parameter, or a `BadChallenge` naming it.
    pub fn require_param(&self, name: &str) -> Result<&str, BadChallenge> {
        self.param(name).ok_or_else(|| {
            BadChallenge::new(&self.scheme, format!("missing required parameter \"{name}\""))
        })
    }

    /// Returns the realm, or a `BadChallenge` if it is absent.
    pub fn require_realm(&self) -> Result<&str, BadChallenge> {
        self.require_param("realm")
    }
}

impl PartialEq for Challenge {
    fn eq(&self, other: &Self) -> bool {
        self.scheme.eq_ignore_ascii_case(&other.scheme)
            && self.realm == other.realm
            && self.token68 == other.token68
            && self.params == other.params
    }
}

impl Eq for Challenge {}

impl Hash for Challenge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scheme.to_ascii_lowercase().hash(state);
        self.realm.hash(state);
        self.token68.hash(state);
        self.params.hash(state);
    }
}

/// Formats the challenge in `WWW-Authenticate` syntax.
///
/// The output parses back to an equal challenge.
impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.scheme)?;
        if let Some(token68) = &self.token68 {
            return write!(f, " {token68}");
        }
        let mut parts = Vec::with_capacity(self.params.len() + 1);
        if let Some(realm) = &self.realm {
            parts.push(format!("realm={}", quote(realm)));
        }
        parts.extend(self.params.iter().map(|(k, v)| format!("{k}={}", quote(v))));
        if !parts.is_empty() {
            write!(f, " {}", parts.join(", "))?;
        }
        Ok(())
    }
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Extracts every challenge from the `WWW-Authenticate` headers of a response.
///
/// Multiple header lines are concatenated in order. Values are read as
/// UTF-8 when they decode as such and as ISO-8859-1 otherwise, so obs-text
/// in a realm never hides a challenge.
pub fn challenges_from_headers(headers: &HeaderMap) -> Vec<Challenge> {
    headers
        .get_all(HEADER_WWW_AUTHENTICATE)
        .iter()
        .map(|value| decode_header_value(value.as_bytes()))
        .flat_map(|value| parse_challenges(&value))
        .collect()
}

fn decode_header_value(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}
