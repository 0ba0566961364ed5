//! Child listings

use turbokeeper_session::KeeperResult;

use super::{BackgroundOptions, completion};
use crate::client::KeeperClient;
use crate::client::background::{BackgroundCallback, PendingOperation};
use crate::events::{EventContext, KeeperEventType};

/// Builder returned by [`KeeperClient::get_children`].
#[derive(Debug)]
pub struct GetChildrenBuilder {
    client: KeeperClient,
    watched: bool,
    background: BackgroundOptions,
}

impl GetChildrenBuilder {
    pub(crate) fn new(client: KeeperClient) -> Self {
        Self {
            client,
            watched: false,
            background: BackgroundOptions::default(),
        }
    }

    /// Leave a watch on the child list
    pub fn watched(mut self) -> Self {
        self.watched = true;
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

    /// List the children now. Names are bare, not full paths.
    pub fn for_path(self, path: &str) -> KeeperResult<Vec<String>> {
        let fixed = self.client.fix_for_namespace(path);
        let session = self.client.session();
        session
            .new_retry_loop()
            .call(|| session.get_children(&fixed, self.watched))
    }

    /// Queue the listing
    pub fn for_path_in_background(self, path: &str) -> KeeperResult<()> {
        let fixed = self.client.fix_for_namespace(path);
        let Self {
            client,
            watched,
            background,
        } = self;
        let namespace = client.namespace_handle().clone();

        let behavior = move |client: &KeeperClient, operation: &PendingOperation<String>| {
            let result = client.session().get_children(operation.data(), watched);
            completion(&namespace, operation, KeeperEventType::Children, result, |event, children| {
                event.with_children(children)
            })
        };
        background.submit(&client, behavior, fixed)
    }
}
