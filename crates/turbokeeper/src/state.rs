//! Connection state tracking
//!
//! The runtime translates raw session notifications into a small set of
//! connection states and broadcasts every transition to registered
//! [`ConnectionStateListener`]s. Broadcasts are serialized: a transition is
//! fully delivered before the next one starts, even when the two originate on
//! different threads. A listener that triggers another transition from inside
//! its callback is delivered the nested transition immediately.

use std::fmt;

use parking_lot::{Mutex, ReentrantMutex};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use turbokeeper_session::{KeeperError, KeeperResult};

use crate::client::KeeperClient;
use crate::client::lifecycle::{Lifecycle, LifecycleState};
use crate::listeners::{ConnectionStateListener, ListenerContainer};

/// Connection state as reported to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// The first successful connection
    Connected,
    /// The connection was lost; the session may still be alive
    Suspended,
    /// A connection was re-established
    Reconnected,
    /// The session is gone
    Lost,
}

impl ConnectionState {
    /// Whether the client currently has a usable connection
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::Reconnected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "CONNECTED"),
            Self::Suspended => write!(f, "SUSPENDED"),
            Self::Reconnected => write!(f, "RECONNECTED"),
            Self::Lost => write!(f, "LOST"),
        }
    }
}

/// Records the current connection state and broadcasts transitions.
pub struct ConnectionStateTracker {
    lifecycle: Lifecycle,
    current: Mutex<Option<ConnectionState>>,
    listeners: ListenerContainer<dyn ConnectionStateListener>,
    broadcast: ReentrantMutex<()>,
}

impl fmt::Debug for ConnectionStateTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionStateTracker")
            .field("lifecycle", &self.lifecycle.get())
            .field("current", &*self.current.lock())
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl Default for ConnectionStateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStateTracker {
    /// Create a tracker; transitions are ignored until it is started
    #[must_use]
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            current: Mutex::new(None),
            listeners: ListenerContainer::new(),
            broadcast: ReentrantMutex::new(()),
        }
    }

    /// Begin accepting transitions.
    pub fn start(&self) -> KeeperResult<()> {
        if self
            .lifecycle
            .transition(LifecycleState::Latent, LifecycleState::Started)
        {
            Ok(())
        } else {
            Err(KeeperError::illegal_state(
                "connection state tracker cannot be started more than once",
            ))
        }
    }

    /// Stop accepting transitions and drop every listener.
    pub fn close(&self) {
        if self
            .lifecycle
            .transition(LifecycleState::Started, LifecycleState::Stopped)
        {
            self.listeners.clear();
        }
    }

    /// The registry of connection state listeners
    pub fn listenable(&self) -> &ListenerContainer<dyn ConnectionStateListener> {
        &self.listeners
    }

    /// The most recently recorded state, if any
    pub fn current(&self) -> Option<ConnectionState> {
        *self.current.lock()
    }

    /// Record `new_state` and notify every listener.
    ///
    /// Returns false without notifying anyone when the tracker is not running.
    pub fn add_state_change(&self, client: &KeeperClient, new_state: ConnectionState) -> bool {
        if !self.lifecycle.is_started() {
            return false;
        }

        let _broadcast = self.broadcast.lock();
        let previous = self.current.lock().replace(new_state);
        info!("State change: {} (was {:?})", new_state, previous);

        self.listeners.dispatch(
            |listener| {
                listener.state_changed(client, new_state);
                Ok(())
            },
            |failure| warn!("Connection state listener failed: {}", failure),
        );
        true
    }
}
