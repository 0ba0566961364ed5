//! Client configuration types
//!
//! Session-level settings (connect string, timeouts, retry policy) live in
//! [`turbokeeper_session::SessionConfig`]; this module holds what the runtime
//! itself needs.

use std::fmt;

/// Default name of the background worker thread
pub const DEFAULT_THREAD_NAME: &str = "turbokeeper-background";

/// Credentials applied to the session once, by the background worker.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthInfo {
    /// The auth scheme, e.g. `digest`
    pub scheme: String,

    /// Scheme-specific credential bytes
    pub auth: Vec<u8>,
}

impl AuthInfo {
    /// Create credentials
    pub fn new(scheme: impl Into<String>, auth: impl Into<Vec<u8>>) -> Self {
        Self {
            scheme: scheme.into(),
            auth: auth.into(),
        }
    }
}

impl fmt::Debug for AuthInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthInfo")
            .field("scheme", &self.scheme)
            .field("auth", &"<redacted>")
            .finish()
    }
}

/// Runtime configuration for a [`crate::KeeperClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root under which every path lives; `None` or empty for no namespace
    pub namespace: Option<String>,

    /// Credentials added to the session before any background operation runs
    pub auth: Option<AuthInfo>,

    /// Payload used by creates that do not supply data
    pub default_data: Vec<u8>,

    /// Name of the background worker thread
    pub thread_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            auth: None,
            default_data: Vec::new(),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}
