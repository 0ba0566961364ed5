//! Client lifecycle state machine
//!
//! A client moves forward exactly once: `Latent -> Started -> Stopped`. The
//! state lives in a single atomic and every transition is a compare-and-swap,
//! so concurrent `start()`/`close()` calls race safely and the loser gets a
//! usage error.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use turbokeeper_session::{KeeperError, KeeperResult};

/// Where a client (or a connection-state tracker) is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LifecycleState {
    /// Constructed, not yet started
    Latent = 0,
    /// Running
    Started = 1,
    /// Closed; cannot be restarted
    Stopped = 2,
}

impl LifecycleState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Latent,
            1 => Self::Started,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latent => write!(f, "latent"),
            Self::Started => write!(f, "started"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Atomically swapped lifecycle state.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: AtomicU8,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub(crate) const fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Latent as u8),
        }
    }

    pub(crate) fn get(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move from `from` to `to`; false if the current state is not `from`.
    pub(crate) fn transition(&self, from: LifecycleState, to: LifecycleState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_started(&self) -> bool {
        self.get() == LifecycleState::Started
    }

    pub(crate) fn ensure_started(&self) -> KeeperResult<()> {
        match self.get() {
            LifecycleState::Started => Ok(()),
            other => Err(KeeperError::illegal_state(format!(
                "client must be started, current state is {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path_only() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.get(), LifecycleState::Latent);

        assert!(!lifecycle.transition(LifecycleState::Started, LifecycleState::Stopped));
        assert!(lifecycle.transition(LifecycleState::Latent, LifecycleState::Started));
        assert!(!lifecycle.transition(LifecycleState::Latent, LifecycleState::Started));
        assert!(lifecycle.is_started());

        assert!(lifecycle.transition(LifecycleState::Started, LifecycleState::Stopped));
        assert!(!lifecycle.transition(LifecycleState::Started, LifecycleState::Stopped));
        assert_eq!(lifecycle.get(), LifecycleState::Stopped);
    }

    #[test]
    fn test_ensure_started() {
        let lifecycle = Lifecycle::new();
        let err = lifecycle.ensure_started().unwrap_err();
        assert!(err.is_illegal_state());
        assert!(err.to_string().contains("latent"));

        lifecycle.transition(LifecycleState::Latent, LifecycleState::Started);
        assert!(lifecycle.ensure_started().is_ok());
    }
}
