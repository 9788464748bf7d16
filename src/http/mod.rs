//! HTTP request/response model and transport collaborator.
//!
//! The negotiation engine never talks to sockets itself. It builds an
//! [`HttpRequest`], lets the chosen authentication context and an optional
//! [`Connector`] mutate it, and hands it to a [`Transport`], which must not
//! follow redirects on its own. [`ReqwestTransport`] is the default
//! implementation; tests substitute scripted ones.

mod reqwest_transport;

use std::fmt;
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use url::Url;

use crate::error_handling::{AuthError, TransportError};

pub use reqwest_transport::ReqwestTransport;

static NEXT_IDENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// TLS client certificate chain and private key, PEM-encoded.
///
/// Attached to a request by X.509 contexts; the transport presents it during
/// the TLS handshake.
pub struct ClientIdentity {
    id: u64,
    pem: Vec<u8>,
    subject: String,
}

impl ClientIdentity {
    /// Wraps PEM text holding the certificate chain followed by the key.
    pub fn from_pem(pem: Vec<u8>, subject: impl Into<String>) -> Self {
        Self {
            id: NEXT_IDENTITY_ID.fetch_add(1, Ordering::Relaxed),
            pem,
            subject: subject.into(),
        }
    }

    /// Process-unique identifier, usable as a cache key.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pem(&self) -> &[u8] {
        &self.pem
    }

    /// Subject distinguished name of the leaf certificate.
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("id", &self.id)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

/// An outgoing, not-yet-sent HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    client_identity: Option<Arc<ClientIdentity>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            client_identity: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn set_body(&mut self, body: Vec<u8>) {
        self.body = Some(body);
    }

    /// Sets an `application/x-www-form-urlencoded` body.
    pub fn set_form(&mut self, fields: &[(&str, &str)]) {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        self.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        self.body = Some(encoded.into_bytes());
    }

    pub fn client_identity(&self) -> Option<&Arc<ClientIdentity>> {
        self.client_identity.as_ref()
    }

    /// Selects the client certificate presented in the TLS handshake.
    pub fn set_client_identity(&mut self, identity: Arc<ClientIdentity>) {
        self.client_identity = Some(identity);
    }
}

/// A received HTTP response whose body has not been read yet.
pub struct HttpResponse {
    url: Url,
    status: u16,
    headers: HeaderMap,
    body: Box<dyn Read + Send>,
}

impl HttpResponse {
    pub fn new(url: Url, status: u16, headers: HeaderMap, body: impl Read + Send + 'static) -> Self {
        Self {
            url,
            status,
            headers,
            body: Box::new(body),
        }
    }

    /// URL the response was received from.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the first value of a header, if present and valid text.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_success(&self) -> bool {
        crate::config::is_success(self.status)
    }

    /// Consumes the response, returning its body stream.
    pub fn into_body(self) -> Box<dyn Read + Send> {
        self.body
    }

    /// Reads the whole body, refusing bodies larger than `limit` bytes.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PayloadTooLarge` if the body exceeds `limit`, or a
    /// transport error if reading fails.
    pub fn read_limited(self, limit: usize) -> Result<Vec<u8>, AuthError> {
        let url = self.url;
        let mut buf = Vec::new();
        self.body
            .take((limit as u64).saturating_add(1))
            .read_to_end(&mut buf)
            .map_err(TransportError::from)?;
        if buf.len() > limit {
            return Err(AuthError::PayloadTooLarge { url, limit });
        }
        Ok(buf)
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("url", &self.url.as_str())
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Executes prepared requests.
///
/// Implementations must send exactly one request per call and must not
/// follow redirects; redirect policy belongs to the caller.
pub trait Transport: Send + Sync {
    /// Sends the request and returns the response headers with an unread body.
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` for failures below HTTP (connect, TLS,
    /// timeout). HTTP error statuses are responses, not errors.
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Customises a request after credentials are applied and before it is sent,
/// e.g. switching the method to `HEAD`.
pub trait Connector: Send + Sync {
    fn prepare(&self, request: &mut HttpRequest);
}

impl<F> Connector for F
where
    F: Fn(&mut HttpRequest) + Send + Sync,
{
    fn prepare(&self, request: &mut HttpRequest) {
        self(request)
    }
}

/// Connector that leaves requests untouched (plain `GET`).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConnector;

impl Connector for DefaultConnector {
    fn prepare(&self, _request: &mut HttpRequest) {}
}
