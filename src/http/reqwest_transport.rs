//! Blocking reqwest transport.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use log::debug;
use reqwest::blocking::{Client, ClientBuilder};
use reqwest::redirect::Policy;
use reqwest::Identity;

use super::{ClientIdentity, HttpRequest, HttpResponse, Transport};
use crate::error_handling::TransportError;

/// [`Transport`] backed by a blocking `reqwest` client.
///
/// Redirect following is disabled. Requests carrying a client certificate
/// are sent through a dedicated client built for that identity. The client
/// lives only as long as some context still holds the identity.
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
    user_agent: String,
    identity_clients: IdentityClients<Client>,
}

/// Per-identity values keyed weakly by identity.
///
/// Entries whose identity has been dropped are pruned on every lookup.
struct IdentityClients<T> {
    entries: Mutex<HashMap<u64, (Weak<ClientIdentity>, T)>>,
}

impl<T: Clone> IdentityClients<T> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get_or_try_insert<E>(
        &self,
        identity: &Arc<ClientIdentity>,
        build: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, (weak, _)| weak.strong_count() > 0);
        if entries.len() < before {
            debug!("Dropped {} client(s) for released identities", before - entries.len());
        }

        if let Some((_, value)) = entries.get(&identity.id()) {
            return Ok(value.clone());
        }
        let value = build()?;
        entries.insert(identity.id(), (Arc::downgrade(identity), value.clone()));
        Ok(value)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl ReqwestTransport {
    /// Creates a transport with the given timeout and User-Agent.
    ///
    /// # Errors
    ///
    /// Returns a `reqwest::Error` if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Result<Self, reqwest::Error> {
        let user_agent = user_agent.into();
        let client = Self::builder(timeout, &user_agent).build()?;
        Ok(Self {
            client,
            timeout,
            user_agent,
            identity_clients: IdentityClients::new(),
        })
    }

    fn builder(timeout: Duration, user_agent: &str) -> ClientBuilder {
        ClientBuilder::new()
            .redirect(Policy::none())
            .timeout(timeout)
            .user_agent(user_agent.to_string())
    }

    fn client_for(&self, request: &HttpRequest) -> Result<Client, TransportError> {
        let Some(identity) = request.client_identity() else {
            return Ok(self.client.clone());
        };

        self.identity_clients.get_or_try_insert(identity, || {
            let client = self.identity_client(identity).map_err(|e| TransportError::Request {
                url: request.url().clone(),
                reason: format!("unusable client certificate {}: {e}", identity.subject()),
            })?;
            debug!("Built TLS client for identity {}", identity.subject());
            Ok(client)
        })
    }

    fn identity_client(&self, identity: &ClientIdentity) -> Result<Client, reqwest::Error> {
        Self::builder(self.timeout, &self.user_agent)
            .identity(Identity::from_pem(identity.pem())?)
            .build()
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let client = self.client_for(&request)?;

        let mut builder = client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        debug!("{} {}", request.method(), request.url());
        let response = builder.send()?;
        let url = response.url().clone();
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        debug!("{} {} -> {}", request.method(), url, status);

        Ok(HttpResponse::new(url, status, headers, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use url::Url;

    #[test]
    fn test_new_transport() {
        let transport = ReqwestTransport::new(Duration::from_secs(5), "vo_auth-test");
        assert!(transport.is_ok());
    }

    #[test]
    fn test_identity_clients_follow_identity_lifetime() {
        let clients = IdentityClients::<u32>::new();
        let alice = Arc::new(ClientIdentity::from_pem(b"a".to_vec(), "CN=alice"));
        let bob = Arc::new(ClientIdentity::from_pem(b"b".to_vec(), "CN=bob"));

        assert_eq!(clients.get_or_try_insert(&alice, || Ok::<_, ()>(1)), Ok(1));
        // Cached: the builder is not called again
        assert_eq!(clients.get_or_try_insert(&alice, || Err(())), Ok(1));
        assert_eq!(clients.get_or_try_insert(&bob, || Ok::<_, ()>(2)), Ok(2));
        assert_eq!(clients.len(), 2);

        drop(alice);
        assert_eq!(clients.get_or_try_insert(&bob, || Err(())), Ok(2));
        assert_eq!(clients.len(), 1);
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        let clients = IdentityClients::<u32>::new();
        let alice = Arc::new(ClientIdentity::from_pem(b"a".to_vec(), "CN=alice"));
        assert_eq!(clients.get_or_try_insert(&alice, || Err("bad")), Err("bad"));
        assert_eq!(clients.len(), 0);
    }

    #[test]
    fn test_bad_identity_is_request_error() {
        let transport = ReqwestTransport::new(Duration::from_secs(5), "vo_auth-test").unwrap();
        let mut request = HttpRequest::get(Url::parse("https://127.0.0.1:1/").unwrap());
        request.set_client_identity(Arc::new(ClientIdentity::from_pem(
            b"not a pem".to_vec(),
            "CN=nobody",
        )));
        match transport.execute(request) {
            Err(TransportError::Request { reason, .. }) => assert!(reason.contains("CN=nobody")),
            other => panic!("expected Request error, got {other:?}"),
        }
    }
}
