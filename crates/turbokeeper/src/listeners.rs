//! Listener traits and the container that fans notifications out to them
//!
//! The runtime exposes three listener registries:
//!
//! - [`EventListener`]: completion events with no per-call callback, watcher
//!   notifications and the final close notice
//! - [`ConnectionStateListener`]: connection state transitions
//! - [`UnhandledErrorListener`]: failures nothing else absorbed
//!
//! Every registry is a [`ListenerContainer`]. Dispatch takes a snapshot of the
//! registered listeners and calls them in registration order. A listener that
//! returns an error or panics is reported through the failure hook and the
//! remaining listeners still run.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;
use turbokeeper_session::{KeeperError, KeeperResult};

use crate::client::KeeperClient;
use crate::events::KeeperEvent;
use crate::state::ConnectionState;

/// Receives completion events and watcher notifications.
pub trait EventListener: Send + Sync {
    /// Called for each event. An error is escalated as an unhandled error.
    fn event_received(&self, client: &KeeperClient, event: &KeeperEvent) -> KeeperResult<()>;
}

impl<F> EventListener for F
where
    F: Fn(&KeeperClient, &KeeperEvent) -> KeeperResult<()> + Send + Sync,
{
    fn event_received(&self, client: &KeeperClient, event: &KeeperEvent) -> KeeperResult<()> {
        self(client, event)
    }
}

/// Receives connection state transitions.
pub trait ConnectionStateListener: Send + Sync {
    /// Called after the tracker records `new_state`
    fn state_changed(&self, client: &KeeperClient, new_state: ConnectionState);
}

impl<F> ConnectionStateListener for F
where
    F: Fn(&KeeperClient, ConnectionState) + Send + Sync,
{
    fn state_changed(&self, client: &KeeperClient, new_state: ConnectionState) {
        self(client, new_state);
    }
}

/// Receives errors that no callback or retry absorbed.
pub trait UnhandledErrorListener: Send + Sync {
    /// `message` describes where the error surfaced
    fn unhandled_error(&self, message: &str, error: &KeeperError);
}

impl<F> UnhandledErrorListener for F
where
    F: Fn(&str, &KeeperError) + Send + Sync,
{
    fn unhandled_error(&self, message: &str, error: &KeeperError) {
        self(message, error);
    }
}

/// Handle returned by [`ListenerContainer::add`], used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey(u64);

/// A thread-safe, ordered set of listeners.
pub struct ListenerContainer<L: ?Sized> {
    entries: RwLock<Vec<(ListenerKey, Arc<L>)>>,
    next_key: AtomicU64,
}

impl<L: ?Sized> Default for ListenerContainer<L> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_key: AtomicU64::new(1),
        }
    }
}

impl<L: ?Sized> fmt::Debug for ListenerContainer<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerContainer")
            .field("listeners", &self.len())
            .finish()
    }
}

impl<L: ?Sized> ListenerContainer<L> {
    /// Create an empty container
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn add(&self, listener: Arc<L>) -> ListenerKey {
        let key = ListenerKey(self.next_key.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((key, listener));
        debug!("Registered listener {:?}", key);
        key
    }

    /// Unregister a listener; false if it was not registered
    pub fn remove(&self, key: ListenerKey) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(k, _)| *k != key);
        before != entries.len()
    }

    /// Unregister every listener
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Call `invoke` on every listener.
    ///
    /// Listeners registered or removed during dispatch take effect on the next
    /// dispatch. Errors and panics are handed to `on_failure`.
    pub(crate) fn dispatch<I, E>(&self, invoke: I, mut on_failure: E)
    where
        I: Fn(&L) -> KeeperResult<()>,
        E: FnMut(KeeperError),
    {
        let snapshot: Vec<Arc<L>> = self
            .entries
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            match catch_unwind(AssertUnwindSafe(|| invoke(&*listener))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => on_failure(error),
                Err(panic) => on_failure(KeeperError::ListenerPanicked(panic_message(&*panic))),
            }
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
