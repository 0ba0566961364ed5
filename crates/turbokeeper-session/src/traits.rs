//! The session client contract.

use std::fmt;
use std::sync::Arc;

use crate::error::KeeperResult;
use crate::events::WatchedEvent;
use crate::retry::{RetryLoop, RetryPolicy};
use crate::types::{Acl, CreateMode, Stat};

/// The low-level client that speaks the coordination-service protocol.
///
/// Implementations own the wire connection and report every raw watcher
/// notification to the [`SessionWatcher`] they were constructed with. All
/// remote calls are blocking; the runtime issues them from its background
/// worker or from the caller's thread.
pub trait SessionClient: Send + Sync + fmt::Debug {
    /// Open the session.
    fn start_session(&self) -> KeeperResult<()>;

    /// Close the session.
    fn close_session(&self) -> KeeperResult<()>;

    /// The server-assigned session id, when connected.
    fn session_id(&self) -> Option<i64>;

    /// Whether the session currently has a live connection.
    fn is_connected(&self) -> bool;

    /// The retry policy configured for this session.
    fn retry_policy(&self) -> Arc<dyn RetryPolicy>;

    /// A fresh synchronous retry loop driven by [`Self::retry_policy`].
    fn new_retry_loop(&self) -> RetryLoop {
        RetryLoop::new(self.retry_policy())
    }

    /// Attach authentication credentials to the session.
    fn add_auth_info(&self, scheme: &str, auth: &[u8]) -> KeeperResult<()>;

    /// Create a node, returning the actual path (sequential modes append a suffix).
    fn create(&self, path: &str, data: &[u8], acl: &[Acl], mode: CreateMode)
    -> KeeperResult<String>;

    /// Delete a node. A version of `-1` matches any version.
    fn delete(&self, path: &str, version: i32) -> KeeperResult<()>;

    /// Stat a node, `None` when it does not exist.
    fn exists(&self, path: &str, watch: bool) -> KeeperResult<Option<Stat>>;

    /// Read a node's data.
    fn get_data(&self, path: &str, watch: bool) -> KeeperResult<(Vec<u8>, Stat)>;

    /// Replace a node's data. A version of `-1` matches any version.
    fn set_data(&self, path: &str, data: &[u8], version: i32) -> KeeperResult<Stat>;

    /// List a node's children.
    fn get_children(&self, path: &str, watch: bool) -> KeeperResult<Vec<String>>;

    /// Read a node's ACL.
    fn get_acl(&self, path: &str) -> KeeperResult<(Vec<Acl>, Stat)>;

    /// Replace a node's ACL. A version of `-1` matches any version.
    fn set_acl(&self, path: &str, acl: &[Acl], version: i32) -> KeeperResult<Stat>;

    /// Flush the channel between this client and the leader for `path`.
    fn sync(&self, path: &str) -> KeeperResult<()>;
}

type WatcherFn = dyn Fn(WatchedEvent) + Send + Sync;

/// The capability a session uses to deliver raw watcher notifications.
///
/// The runtime builds one of these bound to its own event entry point and hands
/// it to the session connector; the session calls [`SessionWatcher::notify`]
/// from whichever thread receives notifications.
#[derive(Clone)]
pub struct SessionWatcher {
    inner: Arc<WatcherFn>,
}

impl SessionWatcher {
    /// Wrap a notification sink.
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(WatchedEvent) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(sink),
        }
    }

    /// A watcher that drops every notification.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Deliver one notification.
    pub fn notify(&self, event: WatchedEvent) {
        (self.inner)(event);
    }
}

impl fmt::Debug for SessionWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionWatcher").finish_non_exhaustive()
    }
}
