//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types for building
//! applications with the TurboKeeper client library.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use turbokeeper::prelude::*;
//! # fn connect(_: SessionConfig, _: SessionWatcher) -> Arc<dyn SessionClient> { unimplemented!() }
//!
//! fn main() -> KeeperResult<()> {
//!     // All common types are available without deep imports
//!     let client = ClientBuilder::new().build(connect)?;
//!     client.start()?;
//!
//!     let children = client.get_children()?.for_path("/")?;
//!     println!("Found {} children", children.len());
//!
//!     client.close()
//! }
//! ```

// Version information
pub use crate::{CRATE_NAME, VERSION};

pub use crate::{
    // Background pipeline
    BackgroundCallback,
    BackgroundOperation,
    // Core client types
    ClientBuilder,
    ConnectionState,
    // Listeners
    ConnectionStateListener,
    EnsurePath,
    EventContext,
    EventListener,
    KeeperClient,
    KeeperError,
    KeeperEvent,
    KeeperEventType,
    KeeperResult,
    LifecycleState,
    PendingOperation,
    UnhandledErrorListener,
};

// Session boundary
pub use turbokeeper_session::{
    Acl, CreateMode, ExponentialBackoffRetry, Id, Perms, ResultCode, RetryNTimes, RetryOneTime,
    RetryPolicy, RetryUntilElapsed, SessionClient, SessionConfig, SessionWatcher, Stat,
};
