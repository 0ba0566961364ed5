//! Node data reads and writes

use turbokeeper_session::{KeeperResult, Stat};

use super::{ANY_VERSION, BackgroundOptions, completion};
use crate::client::KeeperClient;
use crate::client::background::{BackgroundCallback, PendingOperation};
use crate::events::{EventContext, KeeperEventType};

/// Builder returned by [`KeeperClient::get_data`].
#[derive(Debug)]
pub struct GetDataBuilder {
    client: KeeperClient,
    watched: bool,
    background: BackgroundOptions,
}

impl GetDataBuilder {
    pub(crate) fn new(client: KeeperClient) -> Self {
        Self {
            client,
            watched: false,
            background: BackgroundOptions::default(),
        }
    }

    /// Leave a watch on the node's data
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

    /// Read the node's data now
    pub fn for_path(self, path: &str) -> KeeperResult<Vec<u8>> {
        self.for_path_with_stat(path).map(|(data, _)| data)
    }

    /// Read the node's data and metadata now
    pub fn for_path_with_stat(self, path: &str) -> KeeperResult<(Vec<u8>, Stat)> {
        let fixed = self.client.fix_for_namespace(path);
        let session = self.client.session();
        session
            .new_retry_loop()
            .call(|| session.get_data(&fixed, self.watched))
    }

    /// Queue the read; the completion event carries data and stat
    pub fn for_path_in_background(self, path: &str) -> KeeperResult<()> {
        let fixed = self.client.fix_for_namespace(path);
        let Self {
            client,
            watched,
            background,
        } = self;
        let namespace = client.namespace_handle().clone();

        let behavior = move |client: &KeeperClient, operation: &PendingOperation<String>| {
            let result = client.session().get_data(operation.data(), watched);
            completion(&namespace, operation, KeeperEventType::GetData, result, |event, (data, stat)| {
                event.with_data(data).with_stat(stat)
            })
        };
        background.submit(&client, behavior, fixed)
    }
}

/// Builder returned by [`KeeperClient::set_data`].
#[derive(Debug)]
pub struct SetDataBuilder {
    client: KeeperClient,
    data: Vec<u8>,
    version: i32,
    background: BackgroundOptions,
}

impl SetDataBuilder {
    pub(crate) fn new(client: KeeperClient) -> Self {
        Self {
            client,
            data: Vec::new(),
            version: ANY_VERSION,
            background: BackgroundOptions::default(),
        }
    }

    /// The data to write (default empty)
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// Only write if the node is at `version`
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

    /// Write the data now, returning the node's new metadata
    pub fn for_path(self, path: &str) -> KeeperResult<Stat> {
        let fixed = self.client.fix_for_namespace(path);
        let session = self.client.session();
        session
            .new_retry_loop()
            .call(|| session.set_data(&fixed, &self.data, self.version))
    }

    /// Queue the write
    pub fn for_path_in_background(self, path: &str) -> KeeperResult<()> {
        let fixed = self.client.fix_for_namespace(path);
        let Self {
            client,
            data,
            version,
            background,
        } = self;
        let namespace = client.namespace_handle().clone();

        let behavior = move |client: &KeeperClient, operation: &PendingOperation<String>| {
            let result = client.session().set_data(operation.data(), &data, version);
            completion(&namespace, operation, KeeperEventType::SetData, result, |event, stat| {
                event.with_stat(stat)
            })
        };
        background.submit(&client, behavior, fixed)
    }
}
