//! Background sync

use turbokeeper_session::KeeperResult;

use super::completion;
use crate::client::KeeperClient;
use crate::client::background::PendingOperation;
use crate::events::{KeeperEvent, KeeperEventType};
use crate::namespace::Namespace;

/// A sync of `path`, which must already be namespace-fixed.
///
/// Sync has no builder: it always runs in the background and reports to the
/// event listeners.
pub(crate) fn sync_operation(namespace: Namespace, path: String) -> PendingOperation<String> {
    let behavior = move |client: &KeeperClient,
                         operation: &PendingOperation<String>|
          -> KeeperResult<Option<KeeperEvent>> {
        let result = client.session().sync(operation.data());
        completion(&namespace, operation, KeeperEventType::Sync, result, |event, ()| event)
    };
    PendingOperation::new(behavior, path)
}
