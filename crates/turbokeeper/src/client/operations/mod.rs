//! Operation builders
//!
//! One builder per operation family. Every builder offers a synchronous
//! terminal (`for_path`) that runs the call on the caller's thread through the
//! session's retry loop, and a background terminal (`for_path_in_background`)
//! that queues a [`PendingOperation`] and reports the outcome as a
//! [`KeeperEvent`] to the builder's callback or to the event listeners.

mod acl;
mod children;
mod create;
mod data;
mod delete;
mod exists;
mod sync;

pub use acl::{GetAclBuilder, SetAclBuilder};
pub use children::GetChildrenBuilder;
pub use create::CreateBuilder;
pub use data::{GetDataBuilder, SetDataBuilder};
pub use delete::DeleteBuilder;
pub use exists::ExistsBuilder;
pub(crate) use sync::sync_operation;

use std::fmt;
use std::sync::Arc;

use turbokeeper_session::{KeeperError, KeeperResult, ResultCode};

use super::KeeperClient;
use super::background::{BackgroundCallback, PendingOperation};
use crate::events::{EventContext, KeeperEvent, KeeperEventType};
use crate::namespace::Namespace;

/// Version that matches any node version
pub const ANY_VERSION: i32 = -1;

/// Callback and context shared by every builder's background terminal.
#[derive(Default, Clone)]
pub(crate) struct BackgroundOptions {
    callback: Option<Arc<dyn BackgroundCallback>>,
    context: Option<EventContext>,
}

impl fmt::Debug for BackgroundOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundOptions")
            .field("has_callback", &self.callback.is_some())
            .field("has_context", &self.context.is_some())
            .finish()
    }
}

impl BackgroundOptions {
    pub(crate) fn set_callback<C: BackgroundCallback + 'static>(&mut self, callback: C) {
        self.callback = Some(Arc::new(callback));
    }

    pub(crate) fn set_context(&mut self, context: EventContext) {
        self.context = Some(context);
    }

    /// Package `behavior` for `path` and queue it.
    pub(crate) fn submit<B>(self, client: &KeeperClient, behavior: B, path: String) -> KeeperResult<()>
    where
        B: Fn(&KeeperClient, &PendingOperation<String>) -> KeeperResult<Option<KeeperEvent>>
            + Send
            + Sync
            + 'static,
    {
        let operation = PendingOperation::new(behavior, path)
            .with_callback(self.callback)
            .with_context(self.context);
        client.submit_background(operation)
    }
}

/// Turn the result of one session call into a completion event.
///
/// Result codes reported by the service become the event's code so that the
/// pipeline can classify them. Any other error is returned as is.
pub(crate) fn completion<T, F>(
    namespace: &Namespace,
    operation: &PendingOperation<String>,
    event_type: KeeperEventType,
    result: KeeperResult<T>,
    decorate: F,
) -> KeeperResult<Option<KeeperEvent>>
where
    F: FnOnce(KeeperEvent, T) -> KeeperEvent,
{
    let event = |code: ResultCode| {
        KeeperEvent::new(
            event_type,
            code.as_i32(),
            Some(namespace.unfix(operation.data())),
        )
        .with_context(operation.context().cloned())
    };

    match result {
        Ok(value) => Ok(Some(decorate(event(ResultCode::Ok), value))),
        Err(KeeperError::Remote { code, .. }) => Ok(Some(event(code))),
        Err(other) => Err(other),
    }
}
