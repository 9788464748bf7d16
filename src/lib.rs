//! vo_auth library: RFC7235 authentication negotiation for HTTP clients
//!
//! This library opens HTTP connections to services that may demand
//! credentials, as found in the Virtual Observatory where anonymous and
//! authenticated endpoints share one URL space. It parses
//! `WWW-Authenticate` challenges, obtains credentials for the most
//! preferred scheme it understands, caches the credentials that worked, and
//! follows redirects under a protocol-downgrade policy.
//!
//! Supported schemes are RFC7617 `Basic` and the IVOA single sign-on
//! schemes `ivoa_cookie` and `ivoa_x509`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vo_auth::{AuthConfig, AuthManager, FixedUserInterface};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::from_env()?;
//! vo_auth::initialization::init_logger(&config)?;
//!
//! let ui = Arc::new(FixedUserInterface::new("alice", "secret"));
//! let manager = AuthManager::from_config(&config, Some(ui))?;
//!
//! let url = url::Url::parse("https://archive.example.org/tap/capabilities")?;
//! let status = manager.authcheck(&url, true, false)?;
//! println!("{url}: {status}");
//! # Ok(())
//! # }
//! ```
//!
//! All I/O is blocking. Do not call into an `AuthManager` from inside an
//! async runtime without `spawn_blocking`.

pub mod challenge;
pub mod config;
pub mod context;
pub mod error_handling;
pub mod http;
pub mod initialization;
pub mod manager;
pub mod redirect;
pub mod scheme;
pub mod ui;

// Re-export public API
pub use challenge::{challenges_from_headers, parse_challenges, Challenge};
pub use config::{AuthConfig, LogFormat, LogLevel};
pub use context::{AuthContext, ContextCache, ContextKind, ContextList};
pub use error_handling::{AuthError, BadChallenge, RedirectError, Result, TransportError};
pub use http::{Connector, DefaultConnector, HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use manager::{AuthConnection, AuthManager, AuthStatus, AuthType};
pub use redirect::{ProtocolCheck, Redirector};
pub use scheme::{ContextFactory, SchemeKind};
pub use ui::{CredentialRequest, FixedUserInterface, UserInterface, UserPass};
