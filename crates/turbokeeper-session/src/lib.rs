//! # TurboKeeper Session
//!
//! The session boundary of the TurboKeeper runtime. This crate holds everything
//! the runtime consumes from the low-level coordination-service client:
//!
//! - **Codes and errors**: [`ResultCode`], [`KeeperError`], [`KeeperResult`]
//! - **Watcher events**: [`KeeperState`], [`WatchEventType`], [`WatchedEvent`]
//! - **Session client**: the [`SessionClient`] trait and the [`SessionWatcher`]
//!   capability a session uses to report raw watcher notifications
//! - **Retry**: the [`RetryPolicy`] trait, stock policies and the synchronous
//!   [`RetryLoop`]
//! - **Data types**: [`Stat`], [`Acl`], [`Id`], [`CreateMode`]
//!
//! The wire protocol itself lives in whatever crate implements [`SessionClient`].
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//! use turbokeeper_session::{ExponentialBackoffRetry, RetryPolicy};
//!
//! let policy = ExponentialBackoffRetry::new(Duration::from_millis(100), 3);
//! assert!(policy.allow_retry(0, Duration::ZERO));
//! assert!(!policy.allow_retry(3, Duration::ZERO));
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

mod codes;
mod config;
mod error;
mod events;
mod retry;
mod traits;
mod types;

pub use codes::{ResultCode, is_retryable_code};
pub use config::SessionConfig;
pub use error::{KeeperError, KeeperResult};
pub use events::{KeeperState, WatchEventType, WatchedEvent};
pub use retry::{
    ExponentialBackoffRetry, RetryLoop, RetryNTimes, RetryOneTime, RetryPolicy,
    RetryUntilElapsed,
};
pub use traits::{SessionClient, SessionWatcher};
pub use types::{Acl, CreateMode, Id, Perms, Stat};
