//! Runtime events delivered to listeners and background callbacks
//!
//! Every completed background operation, every raw watcher notification and
//! the final close notice reach user code as a [`KeeperEvent`]. Paths carried
//! by an event are already stripped of the client's namespace.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use turbokeeper_session::{Acl, ResultCode, Stat, WatchedEvent};

/// Opaque caller-supplied value echoed back on the completion event.
pub type EventContext = Arc<dyn Any + Send + Sync>;

/// What produced a [`KeeperEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum KeeperEventType {
    /// A create completed
    Create,
    /// A delete completed
    Delete,
    /// An exists check completed
    Exists,
    /// A data read completed
    GetData,
    /// A data write completed
    SetData,
    /// A children listing completed
    Children,
    /// A sync completed
    Sync,
    /// An ACL read completed
    GetAcl,
    /// An ACL write completed
    SetAcl,
    /// A raw watcher notification
    Watched,
    /// The client is closing
    Closing,
}

impl fmt::Display for KeeperEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Exists => "exists",
            Self::GetData => "get_data",
            Self::SetData => "set_data",
            Self::Children => "children",
            Self::Sync => "sync",
            Self::GetAcl => "get_acl",
            Self::SetAcl => "set_acl",
            Self::Watched => "watched",
            Self::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// A completion or notification record.
#[derive(Clone)]
pub struct KeeperEvent {
    event_type: KeeperEventType,
    result_code: i32,
    path: Option<String>,
    name: Option<String>,
    context: Option<EventContext>,
    stat: Option<Stat>,
    data: Option<Vec<u8>>,
    children: Option<Vec<String>>,
    acl: Option<Vec<Acl>>,
    watched_event: Option<WatchedEvent>,
}

impl KeeperEvent {
    /// Create an event with a result code and an optional path.
    #[must_use]
    pub fn new(event_type: KeeperEventType, result_code: i32, path: Option<String>) -> Self {
        Self {
            event_type,
            result_code,
            path,
            name: None,
            context: None,
            stat: None,
            data: None,
            children: None,
            acl: None,
            watched_event: None,
        }
    }

    /// The notice broadcast to every event listener when the client closes.
    #[must_use]
    pub fn closing() -> Self {
        Self::new(KeeperEventType::Closing, ResultCode::Ok.as_i32(), None)
    }

    /// Wrap a raw watcher notification whose path has already been unfixed.
    ///
    /// The result code is the session state's numeric value.
    #[must_use]
    pub fn watched(event: WatchedEvent) -> Self {
        let mut this = Self::new(
            KeeperEventType::Watched,
            event.state.as_i32(),
            event.path.clone(),
        );
        this.watched_event = Some(event);
        this
    }

    /// Attach the created node's actual name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach the caller's context
    #[must_use]
    pub fn with_context(mut self, context: Option<EventContext>) -> Self {
        self.context = context;
        self
    }

    /// Attach node metadata
    #[must_use]
    pub fn with_stat(mut self, stat: Stat) -> Self {
        self.stat = Some(stat);
        self
    }

    /// Attach node data
    #[must_use]
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach a children listing
    #[must_use]
    pub fn with_children(mut self, children: Vec<String>) -> Self {
        self.children = Some(children);
        self
    }

    /// Attach an ACL
    #[must_use]
    pub fn with_acl(mut self, acl: Vec<Acl>) -> Self {
        self.acl = Some(acl);
        self
    }

    /// What produced this event
    #[must_use]
    pub fn event_type(&self) -> KeeperEventType {
        self.event_type
    }

    /// The raw numeric result code
    #[must_use]
    pub fn result_code(&self) -> i32 {
        self.result_code
    }

    /// The result code as a known [`ResultCode`], if it is one.
    ///
    /// Watched events carry a session state rather than a result code.
    #[must_use]
    pub fn result(&self) -> Option<ResultCode> {
        ResultCode::from_i32(self.result_code)
    }

    /// Whether the operation succeeded
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result_code == ResultCode::Ok.as_i32()
    }

    /// The node path, relative to the client's namespace
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// The created node's actual name, relative to the client's namespace
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The caller's context, if one was supplied
    #[must_use]
    pub fn context(&self) -> Option<&EventContext> {
        self.context.as_ref()
    }

    /// Downcast the caller's context
    #[must_use]
    pub fn context_as<T: Any>(&self) -> Option<&T> {
        self.context.as_deref().and_then(|ctx| ctx.downcast_ref::<T>())
    }

    /// Node metadata
    #[must_use]
    pub fn stat(&self) -> Option<&Stat> {
        self.stat.as_ref()
    }

    /// Node data
    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Children listing
    #[must_use]
    pub fn children(&self) -> Option<&[String]> {
        self.children.as_deref()
    }

    /// ACL
    #[must_use]
    pub fn acl(&self) -> Option<&[Acl]> {
        self.acl.as_deref()
    }

    /// The raw watcher notification for [`KeeperEventType::Watched`] events
    #[must_use]
    pub fn watched_event(&self) -> Option<&WatchedEvent> {
        self.watched_event.as_ref()
    }
}

impl fmt::Debug for KeeperEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeeperEvent")
            .field("event_type", &self.event_type)
            .field("result_code", &self.result_code)
            .field("path", &self.path)
            .field("name", &self.name)
            .field("has_context", &self.context.is_some())
            .field("stat", &self.stat)
            .field("data_len", &self.data.as_ref().map(Vec::len))
            .field("children", &self.children)
            .field("acl", &self.acl)
            .field("watched_event", &self.watched_event)
            .finish()
    }
}
