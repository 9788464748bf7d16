//! IVOA SSO `ivoa_x509` scheme.
//!
//! The login endpoint is fetched with Basic credentials and returns a PEM
//! bundle holding a short-lived client certificate chain and its private
//! key. Requests to the challenging host then present that certificate in
//! the TLS handshake.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use url::Url;
use x509_parser::pem::Pem;

use super::basic::authorization_value;
use super::{ContextFactory, ProtectionSpace};
use crate::challenge::Challenge;
use crate::config::{HEADER_AUTHORIZATION, X509_EXPIRY_MARGIN_SECS};
use crate::error_handling::{AuthError, Result};
use crate::http::{ClientIdentity, HttpRequest, Transport};
use crate::ui::UserPass;

pub(super) const SCHEME_NAME: &str = "ivoa_x509";

pub(super) fn login(
    factory: &ContextFactory,
    credentials: &UserPass,
    transport: &dyn Transport,
) -> Result<X509Context> {
    let space = factory.protection_space().clone();
    let login_url = space
        .login_url()
        .cloned()
        .ok_or_else(|| AuthError::credentials(SCHEME_NAME, anyhow!("challenge has no login endpoint")))?;

    let mut request = HttpRequest::get(login_url.clone());
    let auth = authorization_value(credentials)
        .map_err(|e| AuthError::credentials(SCHEME_NAME, anyhow!("unusable credentials: {e}")))?;
    request.headers_mut().insert(HEADER_AUTHORIZATION, auth);
    info!("Requesting certificate from {} as {}", login_url, credentials.username());

    let response = transport.execute(request)?;
    if !response.is_success() {
        return Err(AuthError::LoginStatus {
            url: response.url().clone(),
            status: response.status(),
        });
    }
    let pem = response.read_limited(factory.body_limit())?;
    let decoded = decode_credential(&pem).map_err(|e| AuthError::credentials(SCHEME_NAME, e))?;
    debug!(
        "Obtained certificate for {} expiring {}",
        decoded.subject, decoded.not_after
    );

    Ok(X509Context::new(
        space,
        Arc::new(ClientIdentity::from_pem(pem, decoded.subject)),
        decoded.not_after,
    ))
}

/// Summary of a PEM certificate-and-key bundle.
#[derive(Debug)]
struct DecodedCredential {
    subject: String,
    not_after: DateTime<Utc>,
}

/// Checks a PEM bundle holds at least one certificate and a private key.
///
/// The reported expiry is the earliest `notAfter` in the chain.
fn decode_credential(bytes: &[u8]) -> anyhow::Result<DecodedCredential> {
    let mut subject = None;
    let mut earliest: Option<i64> = None;
    let mut has_key = false;

    for block in Pem::iter_from_buffer(bytes) {
        let block = block.context("malformed PEM block")?;
        match block.label.as_str() {
            "CERTIFICATE" => {
                let cert = block
                    .parse_x509()
                    .map_err(|e| anyhow!("cannot parse certificate: {e}"))?;
                let not_after = cert.validity().not_after.timestamp();
                earliest = Some(earliest.map_or(not_after, |t| t.min(not_after)));
                if subject.is_none() {
                    subject = Some(cert.subject().to_string());
                }
            }
            label if label.ends_with("PRIVATE KEY") => has_key = true,
            label => debug!("Skipping PEM block {label}"),
        }
    }

    let (Some(subject), Some(earliest)) = (subject, earliest) else {
        bail!("no certificate in login response");
    };
    if !has_key {
        bail!("no private key in login response");
    }
    let not_after = DateTime::from_timestamp(earliest, 0)
        .with_context(|| format!("certificate expiry {earliest} out of range"))?;
    Ok(DecodedCredential { subject, not_after })
}

/// Client certificate presented to one host and port.
#[derive(Debug)]
pub struct X509Context {
    space: ProtectionSpace,
    identity: Arc<ClientIdentity>,
    not_after: DateTime<Utc>,
}

impl X509Context {
    pub(crate) fn new(space: ProtectionSpace, identity: Arc<ClientIdentity>, not_after: DateTime<Utc>) -> Self {
        Self {
            space,
            identity,
            not_after,
        }
    }

    /// Subject distinguished name of the certificate.
    pub fn subject(&self) -> &str {
        self.identity.subject()
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    pub fn protection_space(&self) -> &ProtectionSpace {
        &self.space
    }

    pub(crate) fn is_url_domain(&self, url: &Url) -> bool {
        self.space.origin().same_endpoint(url)
    }

    pub(crate) fn is_challenge_domain(&self, challenge: &Challenge, url: &Url) -> bool {
        self.space.matches_challenge(SCHEME_NAME, challenge, url)
    }

    pub(crate) fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(X509_EXPIRY_MARGIN_SECS) >= self.not_after
    }

    pub(crate) fn apply(&self, request: &mut HttpRequest) {
        request.set_client_identity(Arc::clone(&self.identity));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IVOA_STANDARD_TLS_WITH_PASSWORD;
    use crate::scheme::test_support::CannedTransport;
    use crate::scheme::SchemeKind;

    const BUNDLE: &str = include_str!("../../tests/fixtures/alice.pem");
    const CERT_ONLY: &str = include_str!("../../tests/fixtures/cert_only.pem");

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn factory() -> ContextFactory {
        let ch = Challenge::with_params(
            "ivoa_x509",
            None,
            [
                ("standard_id", IVOA_STANDARD_TLS_WITH_PASSWORD),
                ("access_url", "https://login.example.org/cert"),
            ],
        );
        SchemeKind::X509
            .create_context_factory(&ch, &url("https://data.example.org/tap"))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_decode_bundle() {
        let decoded = decode_credential(BUNDLE.as_bytes()).unwrap();
        assert!(decoded.subject.contains("CN=alice"));
        assert!(decoded.not_after > Utc::now() + Duration::days(365 * 50));
    }

    #[test]
    fn test_decode_requires_key_and_certificate() {
        let err = decode_credential(CERT_ONLY.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("private key"));
        let err = decode_credential(b"hello").unwrap_err();
        assert!(err.to_string().contains("no certificate"));
    }

    #[test]
    fn test_login_builds_identity() {
        let transport = CannedTransport::default().respond(200, vec![], BUNDLE.as_bytes());
        let ctx = login(&factory(), &UserPass::new("alice", "pw"), &transport).unwrap();

        let sent = transport.requests.lock().unwrap();
        assert!(sent[0].headers().get(HEADER_AUTHORIZATION).is_some());
        assert_eq!(sent[0].url().as_str(), "https://login.example.org/cert");

        assert!(ctx.subject().contains("alice"));
        assert!(!ctx.is_expired());
        assert!(ctx.is_url_domain(&url("https://data.example.org/other/path")));
        assert!(!ctx.is_url_domain(&url("https://login.example.org/cert")));

        let mut request = HttpRequest::get(url("https://data.example.org/tap"));
        ctx.apply(&mut request);
        assert_eq!(request.client_identity().unwrap().pem(), BUNDLE.as_bytes());
    }

    #[test]
    fn test_login_rejects_oversized_response() {
        let transport = CannedTransport::default().respond(200, vec![], BUNDLE.as_bytes());
        let factory = factory().with_body_limit(64);
        match login(&factory, &UserPass::new("alice", "pw"), &transport) {
            Err(AuthError::PayloadTooLarge { limit, .. }) => assert_eq!(limit, 64),
            other => panic!("expected PayloadTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_expiry_margin() {
        let space = ProtectionSpace::login(&url("https://d.org/"), &url("https://l.org/")).unwrap();
        let identity = Arc::new(ClientIdentity::from_pem(Vec::new(), "CN=x"));
        let soon = X509Context::new(space.clone(), identity.clone(), Utc::now() + Duration::seconds(10));
        assert!(soon.is_expired());
        let later = X509Context::new(space, identity, Utc::now() + Duration::hours(1));
        assert!(!later.is_expired());
    }
}
