//! HTTP transport initialization.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AuthConfig;
use crate::error_handling::InitializationError;
use crate::http::ReqwestTransport;

/// Initializes the reqwest-backed transport.
///
/// Creates a blocking `reqwest` client configured with:
/// - User-Agent header from the configuration
/// - Timeout from the configuration
/// - Redirect following disabled (redirects are handled by `Redirector`)
/// - Rustls TLS backend, with per-identity clients for X.509 login
///
/// # Arguments
///
/// * `config` - Configuration holding the user agent and timeout
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if client creation fails.
pub fn init_transport(config: &AuthConfig) -> Result<Arc<ReqwestTransport>, InitializationError> {
    let transport = ReqwestTransport::new(
        Duration::from_secs(config.timeout_seconds),
        config.user_agent.clone(),
    )?;
    Ok(Arc::new(transport))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_transport_default_config() {
        assert!(init_transport(&AuthConfig::default()).is_ok());
    }
}
