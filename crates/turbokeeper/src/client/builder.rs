//! Client builder pattern for client construction
//!
//! Provides a fluent interface for configuring client options before creation.

use std::sync::Arc;
use std::time::Duration;

use turbokeeper_session::{
    KeeperResult, RetryPolicy, SessionClient, SessionConfig, SessionWatcher,
};

use super::KeeperClient;
use super::config::{AuthInfo, ClientConfig};
use crate::namespace::Namespace;

/// Builder for configuring and creating clients
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use turbokeeper::ClientBuilder;
/// use turbokeeper::session::{RetryNTimes, SessionClient, SessionConfig, SessionWatcher};
/// # fn connect(_: SessionConfig, _: SessionWatcher) -> Arc<dyn SessionClient> { unimplemented!() }
///
/// # fn example() -> turbokeeper::KeeperResult<()> {
/// let client = ClientBuilder::new()
///     .with_connect_string("zk1:2181")
///     .with_session_timeout(Duration::from_secs(30))
///     .with_retry_policy(Arc::new(RetryNTimes::new(5, Duration::from_millis(250))))
///     .with_namespace("service")
///     .with_auth("digest", b"user:password".to_vec())
///     .build(connect)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ClientBuilder {
    session_config: SessionConfig,
    config: ClientConfig,
}

impl ClientBuilder {
    /// Create a new client builder
    ///
    /// Returns a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================================================
    // SESSION CONFIGURATION
    // ============================================================================

    /// Set the ensemble connect string
    ///
    /// # Arguments
    ///
    /// * `connect_string` - Comma-separated `host:port` list
    pub fn with_connect_string(mut self, connect_string: impl Into<String>) -> Self {
        self.session_config.connect_string = connect_string.into();
        self
    }

    /// Set the session timeout
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_config.session_timeout = timeout;
        self
    }

    /// Set the initial connection timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.session_config.connection_timeout = timeout;
        self
    }

    /// Set the retry policy used by both background and synchronous operations
    pub fn with_retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.session_config.retry_policy = policy;
        self
    }

    // ============================================================================
    // RUNTIME CONFIGURATION
    // ============================================================================

    /// Root every path under `namespace`
    ///
    /// An empty namespace means no namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = Some(namespace.into());
        self
    }

    /// Credentials added to the session before any background operation runs
    ///
    /// # Arguments
    ///
    /// * `scheme` - The auth scheme, e.g. `digest`
    /// * `auth` - Scheme-specific credential bytes
    pub fn with_auth(mut self, scheme: impl Into<String>, auth: impl Into<Vec<u8>>) -> Self {
        self.config.auth = Some(AuthInfo::new(scheme, auth));
        self
    }

    /// Data used by creates that do not supply any
    pub fn with_default_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.config.default_data = data.into();
        self
    }

    /// Name of the background worker thread
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    /// The session configuration accumulated so far
    pub fn session_config(&self) -> &SessionConfig {
        &self.session_config
    }

    /// The runtime configuration accumulated so far
    pub fn client_config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build a latent client.
    ///
    /// `connector` receives the session configuration and the watcher the
    /// session must report raw notifications to, and returns the session
    /// client. The session is not started until [`KeeperClient::start`].
    ///
    /// # Errors
    ///
    /// Returns [`turbokeeper_session::KeeperError::Configuration`] for an
    /// invalid namespace.
    pub fn build<F>(self, connector: F) -> KeeperResult<KeeperClient>
    where
        F: FnOnce(SessionConfig, SessionWatcher) -> Arc<dyn SessionClient>,
    {
        let namespace = Namespace::new(self.config.namespace.as_deref())?;
        Ok(KeeperClient::new(
            self.session_config,
            self.config,
            namespace,
            connector,
        ))
    }
}
