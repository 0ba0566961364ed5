//! ACL reads and writes

use turbokeeper_session::{Acl, KeeperResult, Stat};

use super::{ANY_VERSION, BackgroundOptions, completion};
use crate::client::KeeperClient;
use crate::client::background::{BackgroundCallback, PendingOperation};
use crate::events::{EventContext, KeeperEventType};

/// Builder returned by [`KeeperClient::get_acl`].
#[derive(Debug)]
pub struct GetAclBuilder {
    client: KeeperClient,
    background: BackgroundOptions,
}

impl GetAclBuilder {
    pub(crate) fn new(client: KeeperClient) -> Self {
        Self {
            client,
            background: BackgroundOptions::default(),
        }
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

    /// Read the ACL now
    pub fn for_path(self, path: &str) -> KeeperResult<Vec<Acl>> {
        let fixed = self.client.fix_for_namespace(path);
        let session = self.client.session();
        session
            .new_retry_loop()
            .call(|| session.get_acl(&fixed))
            .map(|(acl, _)| acl)
    }

    /// Queue the read; the completion event carries ACL and stat
    pub fn for_path_in_background(self, path: &str) -> KeeperResult<()> {
        let fixed = self.client.fix_for_namespace(path);
        let Self { client, background } = self;
        let namespace = client.namespace_handle().clone();

        let behavior = move |client: &KeeperClient, operation: &PendingOperation<String>| {
            let result = client.session().get_acl(operation.data());
            completion(&namespace, operation, KeeperEventType::GetAcl, result, |event, (acl, stat)| {
                event.with_acl(acl).with_stat(stat)
            })
        };
        background.submit(&client, behavior, fixed)
    }
}

/// Builder returned by [`KeeperClient::set_acl`].
#[derive(Debug)]
pub struct SetAclBuilder {
    client: KeeperClient,
    acl: Vec<Acl>,
    version: i32,
    background: BackgroundOptions,
}

impl SetAclBuilder {
    pub(crate) fn new(client: KeeperClient) -> Self {
        Self {
            client,
            acl: Acl::open_unsafe(),
            version: ANY_VERSION,
            background: BackgroundOptions::default(),
        }
    }

    /// The ACL to apply (default world-open)
    pub fn with_acl(mut self, acl: Vec<Acl>) -> Self {
        self.acl = acl;
        self
    }

    /// Only apply if the node's ACL is at `version`
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

    /// Apply the ACL now, returning the node's new metadata
    pub fn for_path(self, path: &str) -> KeeperResult<Stat> {
        let fixed = self.client.fix_for_namespace(path);
        let session = self.client.session();
        session
            .new_retry_loop()
            .call(|| session.set_acl(&fixed, &self.acl, self.version))
    }

    /// Queue the ACL write
    pub fn for_path_in_background(self, path: &str) -> KeeperResult<()> {
        let fixed = self.client.fix_for_namespace(path);
        let Self {
            client,
            acl,
            version,
            background,
        } = self;
        let namespace = client.namespace_handle().clone();

        let behavior = move |client: &KeeperClient, operation: &PendingOperation<String>| {
            let result = client.session().set_acl(operation.data(), &acl, version);
            completion(&namespace, operation, KeeperEventType::SetAcl, result, |event, stat| {
                event.with_stat(stat)
            })
        };
        background.submit(&client, behavior, fixed)
    }
}
