//! Raw watcher notification types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Session state reported with every watcher notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeeperState {
    /// The client is disconnected from every server of the ensemble.
    Disconnected,
    /// The client is connected to a server.
    SyncConnected,
    /// Authentication failed.
    AuthFailed,
    /// The client is connected to a read-only server.
    ConnectedReadOnly,
    /// SASL authentication succeeded.
    SaslAuthenticated,
    /// The session has expired on the server.
    Expired,
}

impl KeeperState {
    /// The numeric value the service uses for this state.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Disconnected => 0,
            Self::SyncConnected => 3,
            Self::AuthFailed => 4,
            Self::ConnectedReadOnly => 5,
            Self::SaslAuthenticated => 6,
            Self::Expired => -112,
        }
    }

    /// Look up a state by its numeric value.
    #[must_use]
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Disconnected),
            3 => Some(Self::SyncConnected),
            4 => Some(Self::AuthFailed),
            5 => Some(Self::ConnectedReadOnly),
            6 => Some(Self::SaslAuthenticated),
            -112 => Some(Self::Expired),
            _ => None,
        }
    }
}

impl fmt::Display for KeeperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::SyncConnected => write!(f, "sync_connected"),
            Self::AuthFailed => write!(f, "auth_failed"),
            Self::ConnectedReadOnly => write!(f, "connected_read_only"),
            Self::SaslAuthenticated => write!(f, "sasl_authenticated"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// What happened to the watched node, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WatchEventType {
    /// A session state change with no node involved
    None,
    /// The node was created
    NodeCreated,
    /// The node was deleted
    NodeDeleted,
    /// The node's data changed
    NodeDataChanged,
    /// The node's child list changed
    NodeChildrenChanged,
}

/// A one-shot notification delivered by the session's watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedEvent {
    /// The kind of change
    pub event_type: WatchEventType,
    /// The session state at the time of the notification
    pub state: KeeperState,
    /// The affected path, as seen by the service (namespace included)
    pub path: Option<String>,
}

impl WatchedEvent {
    /// Create a notification for a node change
    pub fn new(event_type: WatchEventType, state: KeeperState, path: Option<String>) -> Self {
        Self {
            event_type,
            state,
            path,
        }
    }

    /// Create a pure session-state notification (no node involved)
    #[must_use]
    pub fn session(state: KeeperState) -> Self {
        Self::new(WatchEventType::None, state, None)
    }
}
