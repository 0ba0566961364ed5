//! Existence checks

use turbokeeper_session::{KeeperError, KeeperResult, ResultCode, Stat};

use super::{BackgroundOptions, completion};
use crate::client::KeeperClient;
use crate::client::background::{BackgroundCallback, PendingOperation};
use crate::events::{EventContext, KeeperEventType};

/// Builder returned by [`KeeperClient::check_exists`].
#[derive(Debug)]
pub struct ExistsBuilder {
    client: KeeperClient,
    watched: bool,
    background: BackgroundOptions,
}

impl ExistsBuilder {
    pub(crate) fn new(client: KeeperClient) -> Self {
        Self {
            client,
            watched: false,
            background: BackgroundOptions::default(),
        }
    }

    /// Leave a watch on the node; the notification reaches the event listeners
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

    /// Stat the node now; `None` if it does not exist
    pub fn for_path(self, path: &str) -> KeeperResult<Option<Stat>> {
        let fixed = self.client.fix_for_namespace(path);
        let session = self.client.session();
        session
            .new_retry_loop()
            .call(|| session.exists(&fixed, self.watched))
    }

    /// Queue the check.
    ///
    /// A missing node completes with [`ResultCode::NoNode`] and no stat.
    pub fn for_path_in_background(self, path: &str) -> KeeperResult<()> {
        let fixed = self.client.fix_for_namespace(path);
        let Self {
            client,
            watched,
            background,
        } = self;
        let namespace = client.namespace_handle().clone();

        let behavior = move |client: &KeeperClient, operation: &PendingOperation<String>| {
            let result = client
                .session()
                .exists(operation.data(), watched)
                .and_then(|stat| stat.ok_or_else(|| KeeperError::remote(ResultCode::NoNode)));
            completion(&namespace, operation, KeeperEventType::Exists, result, |event, stat| {
                event.with_stat(stat)
            })
        };
        background.submit(&client, behavior, fixed)
    }
}
