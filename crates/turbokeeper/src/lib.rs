//! # TurboKeeper
//!
//! A resilient client runtime over a coordination-service session. The
//! session itself (wire protocol, connection handling) is supplied by an
//! implementation of [`session::SessionClient`]; this crate adds everything
//! an application needs on top of it:
//!
//! - A start/close lifecycle that can only move forward
//! - A background operation queue drained by one dedicated worker thread
//! - Retry of transient failures, driven by a pluggable [`session::RetryPolicy`]
//! - Escalation of anything unrecoverable to unhandled error listeners
//! - Connection state tracking derived from raw watcher notifications
//! - Listener registries with per-listener failure isolation
//! - Path namespacing, so several logical clients can share one tree
//!
//! ## Architecture
//!
//! ```text
//! Application
//!        ↓  builders, listeners
//! KeeperClient (this crate)
//!        ↓  SessionClient / SessionWatcher
//! Session implementation
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use turbokeeper::prelude::*;
//! # fn connect(_: SessionConfig, _: SessionWatcher) -> Arc<dyn SessionClient> { unimplemented!() }
//!
//! # fn example() -> KeeperResult<()> {
//! let client = KeeperClient::builder()
//!     .with_connect_string("localhost:2181")
//!     .with_namespace("app")
//!     .build(connect)?;
//!
//! client.connection_state_listenable().add(Arc::new(
//!     |_: &KeeperClient, state: ConnectionState| println!("connection is now {state}"),
//! ));
//! client.start()?;
//!
//! let path = client.create()?.with_data(b"v1".to_vec()).for_path("/config")?;
//! let data = client.get_data()?.for_path(&path)?;
//! assert_eq!(data, b"v1");
//!
//! client.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

pub mod client;
pub mod events;
pub mod listeners;
pub mod namespace;
pub mod prelude;
pub mod state;

/// The session boundary this runtime is built on
pub use turbokeeper_session as session;

pub use client::operations::{
    ANY_VERSION, CreateBuilder, DeleteBuilder, ExistsBuilder, GetAclBuilder, GetChildrenBuilder,
    GetDataBuilder, SetAclBuilder, SetDataBuilder,
};
pub use client::{
    AuthInfo, BackgroundCallback, BackgroundOperation, ClientBuilder, ClientConfig, KeeperClient,
    LifecycleState, PendingOperation, VOID_PATH,
};
pub use events::{EventContext, KeeperEvent, KeeperEventType};
pub use listeners::{
    ConnectionStateListener, EventListener, ListenerContainer, ListenerKey, UnhandledErrorListener,
};
pub use namespace::{EnsurePath, Namespace};
pub use state::{ConnectionState, ConnectionStateTracker};
pub use turbokeeper_session::{KeeperError, KeeperResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
