//! Client core implementation
//!
//! This module contains the decomposed client implementation with focused
//! modules for different responsibilities:
//!
//! - `core`: The `KeeperClient` handle, lifecycle, escalation and event routing
//! - `background`: The background operation queue and its worker thread
//! - `lifecycle`: The atomic lifecycle state machine
//! - `config`: Configuration types
//! - `builder`: ClientBuilder pattern for construction
//! - `operations`: Per-family operation builders

pub mod background;
pub mod builder;
pub mod config;
pub mod core;
pub mod lifecycle;
pub mod operations;

pub use background::{BackgroundCallback, BackgroundOperation, PendingOperation};
pub use builder::ClientBuilder;
pub use config::{AuthInfo, ClientConfig};
pub use self::core::{KeeperClient, VOID_PATH};
pub use lifecycle::LifecycleState;
