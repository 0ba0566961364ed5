//! Session configuration handed to session connectors.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::retry::{ExponentialBackoffRetry, RetryPolicy};

/// Everything a session connector needs to open a session.
#[derive(Clone)]
pub struct SessionConfig {
    /// Comma-separated `host:port` list of ensemble members.
    pub connect_string: String,

    /// Session timeout negotiated with the service.
    pub session_timeout: Duration,

    /// How long to wait for the initial connection.
    pub connection_timeout: Duration,

    /// Retry policy the session exposes to the runtime.
    pub retry_policy: Arc<dyn RetryPolicy>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_string: "localhost:2181".to_string(),
            session_timeout: Duration::from_secs(60),
            connection_timeout: Duration::from_secs(15),
            retry_policy: Arc::new(ExponentialBackoffRetry::new(Duration::from_secs(1), 3)),
        }
    }
}

impl SessionConfig {
    /// Create a configuration for the given ensemble with default timeouts.
    pub fn new(connect_string: impl Into<String>) -> Self {
        Self {
            connect_string: connect_string.into(),
            ..Self::default()
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("connect_string", &self.connect_string)
            .field("session_timeout", &self.session_timeout)
            .field("connection_timeout", &self.connection_timeout)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}
