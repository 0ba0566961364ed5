//! Plain data types exchanged with the coordination service.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Node metadata returned by most calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stat {
    /// Transaction id that created the node
    pub czxid: i64,
    /// Transaction id that last modified the node
    pub mzxid: i64,
    /// Creation time in milliseconds since the epoch
    pub ctime: i64,
    /// Last modification time in milliseconds since the epoch
    pub mtime: i64,
    /// Data version
    pub version: i32,
    /// Child list version
    pub cversion: i32,
    /// ACL version
    pub aversion: i32,
    /// Owning session id for ephemeral nodes, zero otherwise
    pub ephemeral_owner: i64,
    /// Length of the node's data
    pub data_length: i32,
    /// Number of children
    pub num_children: i32,
}

/// Permission bits used in [`Acl`] entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Perms(pub u32);

impl Perms {
    /// Read data and list children
    pub const READ: Self = Self(1);
    /// Set data
    pub const WRITE: Self = Self(1 << 1);
    /// Create children
    pub const CREATE: Self = Self(1 << 2);
    /// Delete children
    pub const DELETE: Self = Self(1 << 3);
    /// Set permissions
    pub const ADMIN: Self = Self(1 << 4);
    /// Every permission
    pub const ALL: Self = Self(0x1f);

    /// Whether every bit of `other` is set in `self`
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// An authentication identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Id {
    /// The auth scheme, e.g. `world`, `digest`, `ip`
    pub scheme: String,
    /// The identity within the scheme
    pub id: String,
}

impl Id {
    /// Create an identity
    pub fn new(scheme: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            id: id.into(),
        }
    }

    /// The `world:anyone` identity
    #[must_use]
    pub fn anyone() -> Self {
        Self::new("world", "anyone")
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.id)
    }
}

/// One access-control entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Acl {
    /// Granted permissions
    pub perms: Perms,
    /// Who they are granted to
    pub id: Id,
}

impl Acl {
    /// Create an entry
    #[must_use]
    pub fn new(perms: Perms, id: Id) -> Self {
        Self { perms, id }
    }

    /// The completely open ACL (`world:anyone` with every permission)
    #[must_use]
    pub fn open_unsafe() -> Vec<Self> {
        vec![Self::new(Perms::ALL, Id::anyone())]
    }

    /// The read-only ACL (`world:anyone` may read)
    #[must_use]
    pub fn read_unsafe() -> Vec<Self> {
        vec![Self::new(Perms::READ, Id::anyone())]
    }
}

/// How a node is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateMode {
    /// The node survives the creating session
    #[default]
    Persistent,
    /// Persistent, with a monotonically increasing suffix appended to the name
    PersistentSequential,
    /// The node is deleted when the creating session ends
    Ephemeral,
    /// Ephemeral, with a monotonically increasing suffix appended to the name
    EphemeralSequential,
}

impl CreateMode {
    /// Whether nodes created in this mode are tied to the session
    #[must_use]
    pub const fn is_ephemeral(self) -> bool {
        matches!(self, Self::Ephemeral | Self::EphemeralSequential)
    }

    /// Whether the service appends a sequence suffix
    #[must_use]
    pub const fn is_sequential(self) -> bool {
        matches!(self, Self::PersistentSequential | Self::EphemeralSequential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perms_contains() {
        assert!(Perms::ALL.contains(Perms::READ));
        assert!(Perms::ALL.contains(Perms::ADMIN));
        assert!(!Perms::READ.contains(Perms::WRITE));
    }

    #[test]
    fn test_create_mode_flags() {
        assert!(CreateMode::EphemeralSequential.is_ephemeral());
        assert!(CreateMode::EphemeralSequential.is_sequential());
        assert!(!CreateMode::Persistent.is_ephemeral());
        assert_eq!(CreateMode::default(), CreateMode::Persistent);
    }

    #[test]
    fn test_open_acl() {
        let acl = Acl::open_unsafe();
        assert_eq!(acl.len(), 1);
        assert_eq!(acl[0].id.to_string(), "world:anyone");
    }
}
