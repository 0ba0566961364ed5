//! Node deletion

use turbokeeper_session::KeeperResult;

use super::{ANY_VERSION, BackgroundOptions, completion};
use crate::client::KeeperClient;
use crate::client::background::{BackgroundCallback, PendingOperation};
use crate::events::{EventContext, KeeperEventType};

/// Builder returned by [`KeeperClient::delete`].
#[derive(Debug)]
pub struct DeleteBuilder {
    client: KeeperClient,
    version: i32,
    background: BackgroundOptions,
}

impl DeleteBuilder {
    pub(crate) fn new(client: KeeperClient) -> Self {
        Self {
            client,
            version: ANY_VERSION,
            background: BackgroundOptions::default(),
        }
    }

    /// Only delete if the node is at `version`
    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    /// Deliver the background completion to `callback`
    pub fn with_callback<C: BackgroundCallback + 'static>(mut self, callback: C) -> Self {
        self.background.set_callback(callback);
        self
    }

    /// Echo `context` on the background completion event
    pub fn with_context(mut self, context: EventContext) -> Self {
        self.background.set_context(context);
        self
    }

    /// Delete the node now
    pub fn for_path(self, path: &str) -> KeeperResult<()> {
        let fixed = self.client.fix_for_namespace(path);
        let session = self.client.session();
        session
            .new_retry_loop()
            .call(|| session.delete(&fixed, self.version))
    }

    /// Queue the delete
    pub fn for_path_in_background(self, path: &str) -> KeeperResult<()> {
        let fixed = self.client.fix_for_namespace(path);
        let Self {
            client,
            version,
            background,
        } = self;
        let namespace = client.namespace_handle().clone();

        let behavior = move |client: &KeeperClient, operation: &PendingOperation<String>| {
            let result = client.session().delete(operation.data(), version);
            completion(&namespace, operation, KeeperEventType::Delete, result, |event, ()| event)
        };
        background.submit(&client, behavior, fixed)
    }
}
