//! Node creation

use turbokeeper_session::{Acl, CreateMode, KeeperResult};

use super::{BackgroundOptions, completion};
use crate::client::KeeperClient;
use crate::client::background::{BackgroundCallback, PendingOperation};
use crate::events::{EventContext, KeeperEventType};

/// Builder returned by [`KeeperClient::create`].
#[derive(Debug)]
pub struct CreateBuilder {
    client: KeeperClient,
    mode: CreateMode,
    acl: Vec<Acl>,
    data: Option<Vec<u8>>,
    background: BackgroundOptions,
}

impl CreateBuilder {
    pub(crate) fn new(client: KeeperClient) -> Self {
        Self {
            client,
            mode: CreateMode::Persistent,
            acl: Acl::open_unsafe(),
            data: None,
            background: BackgroundOptions::default(),
        }
    }

    /// Set the create mode (default [`CreateMode::Persistent`])
    pub fn with_mode(mut self, mode: CreateMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the node's ACL (default world-open)
    pub fn with_acl(mut self, acl: Vec<Acl>) -> Self {
        self.acl = acl;
        self
    }

    /// Set the node's data; the client's default data is used otherwise
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
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

    fn payload(&self) -> Vec<u8> {
        self.data
            .clone()
            .unwrap_or_else(|| self.client.default_data().to_vec())
    }

    /// Create the node now and return its actual path.
    ///
    /// Sequential modes append a suffix, so the returned path may differ from
    /// `path`. The result is relative to the client's namespace.
    pub fn for_path(self, path: &str) -> KeeperResult<String> {
        let fixed = self.client.fix_for_namespace(path);
        let data = self.payload();
        let session = self.client.session();

        let created = session
            .new_retry_loop()
            .call(|| session.create(&fixed, &data, &self.acl, self.mode))?;
        Ok(self.client.unfix_for_namespace(&created))
    }

    /// Queue the create.
    ///
    /// The completion event carries the created node's actual name.
    pub fn for_path_in_background(self, path: &str) -> KeeperResult<()> {
        let fixed = self.client.fix_for_namespace(path);
        let data = self.payload();
        let Self {
            client,
            mode,
            acl,
            background,
            ..
        } = self;
        let namespace = client.namespace_handle().clone();

        let behavior = move |client: &KeeperClient, operation: &PendingOperation<String>| {
            let result = client
                .session()
                .create(operation.data(), &data, &acl, mode);
            completion(&namespace, operation, KeeperEventType::Create, result, |event, name| {
                event.with_name(namespace.unfix(&name))
            })
        };
        background.submit(&client, behavior, fixed)
    }
}
