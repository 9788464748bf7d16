//! Authentication manager.
//!
//! [`AuthManager`] opens HTTP connections on behalf of callers, negotiating
//! RFC7235 authentication where a server asks for it and remembering the
//! credentials that worked so later requests to the same protection space
//! carry them from the start.
//!
//! A manager is safe to share between threads. Concurrent callers
//! negotiating the same protection space may each prompt the user; whichever
//! succeeds populates the shared cache for everyone afterwards.

mod authcheck;
mod negotiate;
mod status;

use std::io::Read;
use std::sync::{Arc, PoisonError, RwLock};

use log::info;
use url::Url;

use crate::config::{AuthConfig, MAX_LOGIN_RESPONSE_SIZE, MAX_REDIRECT_HOPS};
use crate::context::{AuthContext, ContextCache};
use crate::error_handling::{AuthError, InitializationError, Result};
use crate::http::{Connector, DefaultConnector, HttpResponse, Transport};
use crate::initialization::init_transport;
use crate::redirect::Redirector;
use crate::scheme::SchemeKind;
use crate::ui::UserInterface;

pub use status::{AuthStatus, AuthType};

static DEFAULT_INSTANCE: RwLock<Option<Arc<AuthManager>>> = RwLock::new(None);

/// A response together with the context that produced it.
#[derive(Debug)]
pub struct AuthConnection {
    response: HttpResponse,
    context: Option<AuthContext>,
}

impl AuthConnection {
    pub(crate) fn new(response: HttpResponse, context: Option<AuthContext>) -> Self {
        Self { response, context }
    }

    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    /// Context whose credentials were presented, if any.
    pub fn context(&self) -> Option<&AuthContext> {
        self.context.as_ref()
    }

    pub fn status(&self) -> u16 {
        self.response.status()
    }

    pub fn into_response(self) -> HttpResponse {
        self.response
    }
}

/// Negotiates authentication and redirects for HTTP connections.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use vo_auth::{AuthConfig, AuthManager, FixedUserInterface};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let ui = Arc::new(FixedUserInterface::new("alice", "secret"));
/// let manager = AuthManager::from_config(&AuthConfig::default(), Some(ui))?;
/// let url = url::Url::parse("https://archive.example.org/tap/sync")?;
/// let response = manager.connect(&url)?;
/// println!("{}", response.status());
/// # Ok(())
/// # }
/// ```
pub struct AuthManager {
    ui: RwLock<Option<Arc<dyn UserInterface>>>,
    schemes: RwLock<Vec<SchemeKind>>,
    cache: ContextCache,
    redirector: Redirector,
    transport: Arc<dyn Transport>,
    max_redirects: usize,
    max_login_response_size: usize,
}

impl AuthManager {
    /// Creates a manager.
    ///
    /// # Arguments
    ///
    /// * `ui` - Source of credentials; with `None`, no authentication is
    ///   attempted and responses are returned as received
    /// * `schemes` - Supported schemes, most preferred first
    /// * `redirector` - Default redirect policy
    /// * `transport` - Sends the requests; must not follow redirects
    pub fn new(
        ui: Option<Arc<dyn UserInterface>>,
        schemes: Vec<SchemeKind>,
        redirector: Redirector,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            ui: RwLock::new(ui),
            schemes: RwLock::new(schemes),
            cache: ContextCache::new(),
            redirector,
            transport,
            max_redirects: MAX_REDIRECT_HOPS,
            max_login_response_size: MAX_LOGIN_RESPONSE_SIZE,
        }
    }

    /// Builds a manager with a reqwest transport from `config`.
    ///
    /// # Errors
    ///
    /// Returns `InitializationError` if the configuration is invalid or the
    /// HTTP client cannot be built.
    pub fn from_config(
        config: &AuthConfig,
        ui: Option<Arc<dyn UserInterface>>,
    ) -> std::result::Result<Self, InitializationError> {
        config.validate()?;
        let transport = init_transport(config)?;
        Ok(Self::new(ui, config.schemes.clone(), Redirector::default(), transport)
            .with_max_redirects(config.max_redirects)
            .with_login_response_limit(config.max_login_response_size))
    }

    /// Caps the number of redirects one `connect` call follows.
    pub fn with_max_redirects(mut self, limit: usize) -> Self {
        self.max_redirects = limit;
        self
    }

    /// Caps the size of login endpoint responses.
    pub fn with_login_response_limit(mut self, limit: usize) -> Self {
        self.max_login_response_size = limit;
        self
    }

    /// Returns the process-default manager, creating it on first use.
    ///
    /// The initial default has no user interface, so it authenticates
    /// nothing until [`set_user_interface`](Self::set_user_interface) is
    /// called.
    ///
    /// # Errors
    ///
    /// Returns `InitializationError` if the default HTTP client cannot be
    /// built.
    pub fn instance() -> std::result::Result<Arc<AuthManager>, InitializationError> {
        if let Some(manager) = DEFAULT_INSTANCE
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Arc::clone(manager));
        }
        let mut slot = DEFAULT_INSTANCE.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(manager) = slot.as_ref() {
            return Ok(Arc::clone(manager));
        }
        let manager = Arc::new(AuthManager::from_config(&AuthConfig::default(), None)?);
        *slot = Some(Arc::clone(&manager));
        Ok(manager)
    }

    /// Replaces the process-default manager.
    pub fn set_default_instance(manager: Arc<AuthManager>) {
        *DEFAULT_INSTANCE.write().unwrap_or_else(PoisonError::into_inner) = Some(manager);
    }

    pub fn user_interface(&self) -> Option<Arc<dyn UserInterface>> {
        self.ui.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Sets or removes the user interface.
    pub fn set_user_interface(&self, ui: Option<Arc<dyn UserInterface>>) {
        *self.ui.write().unwrap_or_else(PoisonError::into_inner) = ui;
    }

    /// Supported schemes, most preferred first.
    pub fn schemes(&self) -> Vec<SchemeKind> {
        self.schemes.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_schemes(&self, schemes: Vec<SchemeKind>) {
        *self.schemes.write().unwrap_or_else(PoisonError::into_inner) = schemes;
    }

    /// Cached authentication contexts.
    pub fn cache(&self) -> &ContextCache {
        &self.cache
    }

    /// Default redirect policy.
    pub fn redirector(&self) -> &Redirector {
        &self.redirector
    }

    /// Forgets all cached authentication contexts.
    pub fn clear(&self) {
        info!("Clearing all authentication contexts");
        self.cache.clear();
    }

    /// Connects to `url` with a plain `GET`, negotiating authentication and
    /// following redirects under the default policy.
    ///
    /// Authentication failures are not errors: the returned response may
    /// have any status.
    ///
    /// # Errors
    ///
    /// See [`make_connection`](Self::make_connection).
    pub fn connect(&self, url: &Url) -> Result<HttpResponse> {
        self.connect_with(url, &DefaultConnector, &self.redirector)
    }

    /// Like [`connect`](Self::connect) with a custom connector and redirect
    /// policy.
    pub fn connect_with(
        &self,
        url: &Url,
        connector: &dyn Connector,
        redirector: &Redirector,
    ) -> Result<HttpResponse> {
        self.make_connection(url, connector, redirector)
            .map(AuthConnection::into_response)
    }

    /// Connects to `url`, returning the final response together with the
    /// context that produced it.
    ///
    /// Each URL in a redirect chain is negotiated from scratch, so the
    /// returned context belongs to the final URL's protection space.
    ///
    /// # Errors
    ///
    /// - `MissingChallenge` for a 401 without challenges
    /// - `NoSupportedScheme` if no configured scheme accepts any challenge
    /// - `Redirect` for an unfollowable or refused redirect
    /// - `TooManyRedirects` once the hop limit is exceeded
    /// - `Transport` and credential acquisition errors
    pub fn make_connection(
        &self,
        url: &Url,
        connector: &dyn Connector,
        redirector: &Redirector,
    ) -> Result<AuthConnection> {
        let mut current = url.clone();
        let mut hops = 0;
        loop {
            let aconn = self.negotiate(&current, connector)?;
            let Some(next) = redirector.get_redirect_url(aconn.response())? else {
                return Ok(aconn);
            };
            hops += 1;
            if hops > self.max_redirects {
                return Err(AuthError::TooManyRedirects {
                    url: url.clone(),
                    limit: self.max_redirects,
                });
            }
            info!("HTTP {} redirect to {}", aconn.status(), next);
            current = next;
        }
    }

    /// Follows `response` if `redirector` treats it as a redirect,
    /// negotiating authentication for the target.
    ///
    /// Returns `response` unchanged if it is not a redirect.
    pub fn follow_redirects(
        &self,
        response: HttpResponse,
        connector: &dyn Connector,
        redirector: &Redirector,
    ) -> Result<HttpResponse> {
        match redirector.get_redirect_url(&response)? {
            Some(target) => {
                info!("HTTP {} redirect to {}", response.status(), target);
                self.connect_with(&target, connector, redirector)
            }
            None => Ok(response),
        }
    }

    /// Connects to `url` and returns the response body.
    ///
    /// # Errors
    ///
    /// As [`connect`](Self::connect), plus `HttpStatus` if the final
    /// response is not 2xx.
    pub fn open_stream(&self, url: &Url) -> Result<Box<dyn Read + Send>> {
        let response = self.connect(url)?;
        if !response.is_success() {
            return Err(AuthError::HttpStatus {
                url: response.url().clone(),
                status: response.status(),
            });
        }
        Ok(response.into_body())
    }
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("schemes", &self.schemes())
            .field("has_ui", &self.user_interface().is_some())
            .field("cache", &self.cache)
            .field("redirector", &self.redirector)
            .finish_non_exhaustive()
    }
}
