//! Per-URL authentication negotiation.
//!
//! One negotiation covers a single URL and never follows redirects:
//! 1. try the cached context whose URL domain covers the URL, if any
//! 2. on 401/403 with a user interface present, read the challenges
//! 3. retry with a cached context that already answered one of them,
//!    unless it is the one just refused
//! 4. otherwise pick the preferred (scheme, challenge) pair and ask the
//!    user for credentials, retrying while the user interface allows

use log::{debug, info, warn};
use url::Url;

use super::{AuthConnection, AuthManager};
use crate::challenge::{challenges_from_headers, Challenge};
use crate::config::{is_auth_failure, is_success, HTTP_STATUS_UNAUTHORIZED};
use crate::context::AuthContext;
use crate::error_handling::{auth_failure_message, AuthError, Result};
use crate::http::{Connector, HttpRequest};
use crate::scheme::ContextFactory;
use crate::ui::UserInterface;

impl AuthManager {
    pub(super) fn negotiate(&self, url: &Url, connector: &dyn Connector) -> Result<AuthConnection> {
        let cached = self.cache.find_url_context(url);
        let aconn = self.attempt(url, connector, cached.as_ref())?;

        let Some(ui) = self.user_interface() else {
            return Ok(aconn);
        };
        let status = aconn.status();
        if !is_auth_failure(status) {
            return Ok(aconn);
        }

        let challenges = challenges_from_headers(aconn.response().headers());
        if challenges.is_empty() {
            if status == HTTP_STATUS_UNAUTHORIZED {
                return Err(AuthError::MissingChallenge { url: url.clone() });
            }
            return Ok(aconn);
        }

        match self.cache.find_challenge_context(&challenges, url) {
            // Already presented above and refused
            Some(context) if cached.as_ref() == Some(&context) => {
                self.assess_attempt(&context, &aconn);
                drop(aconn);
            }
            Some(context) => {
                drop(aconn);
                let retry = self.attempt(url, connector, Some(&context))?;
                if self.assess_attempt(&context, &retry) {
                    return Ok(retry);
                }
            }
            None => drop(aconn),
        }

        let factory = self
            .preferred_context_factory(&challenges, url)
            .ok_or_else(|| AuthError::NoSupportedScheme { url: url.clone() })?;
        self.connect_with_challenge(url, connector, &factory, ui.as_ref())
    }

    /// Sends one request to `url`, presenting `context` if given.
    pub(super) fn attempt(
        &self,
        url: &Url,
        connector: &dyn Connector,
        context: Option<&AuthContext>,
    ) -> Result<AuthConnection> {
        let mut request = HttpRequest::get(url.clone());
        if let Some(context) = context {
            context.apply(&mut request);
        }
        connector.prepare(&mut request);

        debug!(
            "{} connection to {}",
            match context {
                None => "Unauthenticated",
                Some(c) if c.has_credentials() => "Authenticated",
                Some(_) => "Anonymous",
            },
            url
        );
        let response = self.transport.execute(request)?;
        Ok(AuthConnection::new(response, context.cloned()))
    }

    /// Decides whether a response obtained with a reused context is usable.
    ///
    /// A context with credentials that met 401/403 is evicted from both
    /// lists. Anonymous contexts are never evicted, but their 401/403 is
    /// not accepted either.
    pub(super) fn assess_attempt(&self, context: &AuthContext, aconn: &AuthConnection) -> bool {
        if !is_auth_failure(aconn.status()) {
            return true;
        }
        if context.has_credentials() {
            info!(
                "Discarding rejected context {} ({})",
                context,
                aconn.status()
            );
            self.cache.evict(context);
        }
        false
    }

    /// Picks the most preferred scheme that accepts any of `challenges`.
    ///
    /// Schemes are tried in preference order; within a scheme, challenges
    /// in the order received. Challenges a scheme rejects are logged and
    /// skipped.
    pub(super) fn preferred_context_factory(
        &self,
        challenges: &[Challenge],
        url: &Url,
    ) -> Option<ContextFactory> {
        for scheme in self.schemes() {
            for challenge in challenges {
                match scheme.create_context_factory(challenge, url) {
                    Ok(Some(factory)) => {
                        return Some(factory.with_body_limit(self.max_login_response_size))
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Challenge error reported by scheme {scheme}: {e} ({challenge})"),
                }
            }
        }
        None
    }

    /// Asks the user for credentials answering `factory`'s challenge and
    /// connects with them, repeating after rejections while the user
    /// interface can retry.
    pub(super) fn connect_with_challenge(
        &self,
        url: &Url,
        connector: &dyn Connector,
        factory: &ContextFactory,
        ui: &dyn UserInterface,
    ) -> Result<AuthConnection> {
        loop {
            info!("Acquiring {} credentials for {}", factory.scheme(), url);
            let Some(context) = factory.create_context(ui, self.transport.as_ref())? else {
                let anonymous = factory.create_unauth_context();
                info!("Configuring anonymous context for {url}");
                self.cache.put_anonymous(&anonymous);
                return self.attempt(url, connector, Some(&anonymous));
            };

            let aconn = self.attempt(url, connector, Some(&context))?;
            let status = aconn.status();

            if is_auth_failure(status) {
                self.cache.reserve().remove(&context);
                if ui.can_retry() {
                    ui.message(&[
                        "Authentication failed".to_string(),
                        auth_failure_message(status),
                    ]);
                    continue;
                }
                info!("Unsuccessful authentication ({status}) for {url}");
                return Ok(aconn);
            }

            if is_success(status) {
                info!(
                    "Configuring authenticated context using scheme {} for {} ({})",
                    context.scheme(),
                    url,
                    status
                );
                self.cache.promote(&context);
            } else {
                debug!("Keeping unconfirmed context for {url} ({status})");
                self.cache.add_reserve(&context);
            }
            return Ok(aconn);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    use reqwest::header::{HeaderMap, HeaderValue};

    use super::*;
    use crate::config::HEADER_WWW_AUTHENTICATE;
    use crate::error_handling::TransportError;
    use crate::http::{DefaultConnector, HttpResponse, Transport};
    use crate::redirect::Redirector;
    use crate::scheme::SchemeKind;
    use crate::ui::FixedUserInterface;

    struct Queue(Mutex<VecDeque<(u16, Option<&'static str>)>>);

    impl Transport for Queue {
        fn execute(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
            let (status, challenge) = self.0.lock().unwrap().pop_front().expect("unexpected request");
            let mut headers = HeaderMap::new();
            if let Some(challenge) = challenge {
                headers.insert(HEADER_WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
            }
            Ok(HttpResponse::new(request.url().clone(), status, headers, Cursor::new(Vec::new())))
        }
    }

    fn manager(schemes: Vec<SchemeKind>, script: Vec<(u16, Option<&'static str>)>) -> AuthManager {
        AuthManager::new(
            Some(Arc::new(FixedUserInterface::new("u", "p"))),
            schemes,
            Redirector::default(),
            Arc::new(Queue(Mutex::new(script.into()))),
        )
    }

    fn url() -> Url {
        Url::parse("https://e.org/tap/sync").unwrap()
    }

    #[test]
    fn test_preferred_factory_does_not_stop_at_first_scheme() {
        let m = manager(vec![SchemeKind::Cookie, SchemeKind::Basic], vec![]);
        let challenges = vec![
            Challenge::with_token68("Bearer", "x"),
            Challenge::with_params("Basic", Some("r".into()), Vec::<(String, String)>::new()),
        ];
        let factory = m.preferred_context_factory(&challenges, &url()).unwrap();
        assert_eq!(factory.scheme(), SchemeKind::Basic);
    }

    #[test]
    fn test_preferred_factory_follows_scheme_order() {
        let m = manager(vec![SchemeKind::Basic, SchemeKind::Cookie], vec![]);
        let challenges = vec![
            Challenge::with_params(
                "ivoa_cookie",
                None,
                [
                    ("standard_id", crate::config::IVOA_STANDARD_TLS_WITH_PASSWORD),
                    ("access_url", "https://e.org/login"),
                ],
            ),
            Challenge::with_params("Basic", Some("r".into()), Vec::<(String, String)>::new()),
        ];
        let factory = m.preferred_context_factory(&challenges, &url()).unwrap();
        assert_eq!(factory.scheme(), SchemeKind::Basic);
    }

    #[test]
    fn test_rejected_challenge_is_skipped() {
        let m = manager(SchemeKind::default_preference(), vec![]);
        let challenges = vec![
            Challenge::new("Basic"),
            Challenge::with_params("Basic", Some("ok".into()), Vec::<(String, String)>::new()),
        ];
        let factory = m.preferred_context_factory(&challenges, &url()).unwrap();
        assert_eq!(factory.challenge().realm(), Some("ok"));
        assert!(m.preferred_context_factory(&challenges[..1], &url()).is_none());
    }

    #[test]
    fn test_missing_challenge_on_401_is_error() {
        let m = manager(SchemeKind::default_preference(), vec![(401, None)]);
        let err = m.negotiate(&url(), &DefaultConnector).unwrap_err();
        assert!(matches!(err, AuthError::MissingChallenge { .. }));
    }

    #[test]
    fn test_403_without_challenge_is_returned() {
        let m = manager(SchemeKind::default_preference(), vec![(403, None)]);
        assert_eq!(m.negotiate(&url(), &DefaultConnector).unwrap().status(), 403);
    }

    #[test]
    fn test_unsupported_scheme_is_error() {
        let m = manager(SchemeKind::default_preference(), vec![(401, Some("Negotiate"))]);
        let err = m.negotiate(&url(), &DefaultConnector).unwrap_err();
        assert!(matches!(err, AuthError::NoSupportedScheme { .. }));
    }

    #[test]
    fn test_no_user_interface_returns_401() {
        let m = manager(SchemeKind::default_preference(), vec![(401, None)]);
        m.set_user_interface(None);
        assert_eq!(m.negotiate(&url(), &DefaultConnector).unwrap().status(), 401);
    }

    #[test]
    fn test_ambiguous_status_leaves_context_in_reserve() {
        let m = manager(
            SchemeKind::default_preference(),
            vec![(401, Some("Basic realm=\"r\"")), (500, None)],
        );
        let aconn = m.negotiate(&url(), &DefaultConnector).unwrap();
        assert_eq!(aconn.status(), 500);
        let context = aconn.context().unwrap().clone();
        assert!(m.cache().reserve().contains(&context));
        assert!(!m.cache().validated().contains(&context));
    }

    #[test]
    fn test_refused_cached_context_is_not_resent() {
        let queue = Arc::new(Queue(Mutex::new(
            vec![
                (401, Some("Basic realm=\"r\"")),
                (200, None),
                (401, Some("Basic realm=\"r\"")),
                (401, Some("Basic realm=\"r\"")),
            ]
            .into(),
        )));
        let m = AuthManager::new(
            Some(Arc::new(FixedUserInterface::new("u", "p"))),
            SchemeKind::default_preference(),
            Redirector::default(),
            queue.clone(),
        );

        assert_eq!(m.negotiate(&url(), &DefaultConnector).unwrap().status(), 200);
        assert_eq!(m.cache().validated().len(), 1);

        // Cached credentials refused, then one fresh login attempt
        let aconn = m.negotiate(&url(), &DefaultConnector).unwrap();
        assert_eq!(aconn.status(), 401);
        assert!(queue.0.lock().unwrap().is_empty());
        assert!(m.cache().validated().is_empty());
        assert!(m.cache().reserve().is_empty());
    }

    #[test]
    fn test_rejection_without_retry_returns_failure() {
        let m = manager(
            SchemeKind::default_preference(),
            vec![(401, Some("Basic realm=\"r\"")), (401, Some("Basic realm=\"r\""))],
        );
        let aconn = m.negotiate(&url(), &DefaultConnector).unwrap();
        assert_eq!(aconn.status(), 401);
        assert!(m.cache().validated().is_empty());
        assert!(m.cache().reserve().is_empty());
    }
}
