//! Core client implementation
//!
//! [`KeeperClient`] is a cheap, cloneable handle over shared runtime state.
//! It owns the lifecycle, the background worker, the listener registries, the
//! connection state tracker and the namespace, and it is the single entry
//! point for raw watcher notifications coming back from the session.
//!
//! Result handling for background operations lives here as well:
//!
//! 1. no event: re-enqueue
//! 2. retryable result code: re-enqueue while the retry policy allows it,
//!    otherwise escalate as an unhandled error
//! 3. callback present: hand it the event; a callback error or panic takes
//!    the retry and escalation path with the same operation
//! 4. otherwise: dispatch to the event listeners

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, error, info};
use turbokeeper_session::{
    KeeperError, KeeperResult, KeeperState, RetryLoop, SessionClient, SessionConfig,
    SessionWatcher, WatchedEvent, is_retryable_code,
};

use super::background::{BackgroundQueue, PendingOperation};
use super::builder::ClientBuilder;
use super::config::{AuthInfo, ClientConfig};
use super::lifecycle::{Lifecycle, LifecycleState};
use super::operations::{
    CreateBuilder, DeleteBuilder, ExistsBuilder, GetAclBuilder, GetChildrenBuilder,
    GetDataBuilder, SetAclBuilder, SetDataBuilder, sync_operation,
};
use crate::events::{EventContext, KeeperEvent, KeeperEventType};
use crate::listeners::{
    ConnectionStateListener, EventListener, ListenerContainer, UnhandledErrorListener,
    panic_message,
};
use crate::namespace::{EnsurePath, Namespace};
use crate::state::{ConnectionState, ConnectionStateTracker};

/// Path handed to the session when the namespace root could not be ensured.
///
/// The session rejects it, so the call fails instead of touching a path
/// outside the namespace.
pub const VOID_PATH: &str = "";

/// Path the synthetic connection check syncs against
const ROOT_PATH: &str = "/";

/// Shared runtime state behind every [`KeeperClient`] handle.
pub(crate) struct ClientInner {
    session: Arc<dyn SessionClient>,
    lifecycle: Lifecycle,
    listeners: ListenerContainer<dyn EventListener>,
    unhandled_error_listeners: ListenerContainer<dyn UnhandledErrorListener>,
    connection_state: ConnectionStateTracker,
    background: BackgroundQueue,
    auth_info: Mutex<Option<AuthInfo>>,
    default_data: Vec<u8>,
    namespace: Namespace,
    thread_name: String,
}

/// A resilient client over a coordination-service session.
///
/// Clones share the same runtime. A client starts out latent: call
/// [`KeeperClient::start`] before issuing operations and
/// [`KeeperClient::close`] when done.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use turbokeeper::{KeeperClient, KeeperEvent, KeeperResult};
/// # use turbokeeper::session::{SessionClient, SessionConfig, SessionWatcher};
/// # fn connect(_: SessionConfig, _: SessionWatcher) -> Arc<dyn SessionClient> { unimplemented!() }
///
/// # fn example() -> KeeperResult<()> {
/// let client = KeeperClient::builder()
///     .with_connect_string("zk1:2181,zk2:2181")
///     .with_namespace("app")
///     .build(connect)?;
/// client.start()?;
///
/// client
///     .create()?
///     .with_data(b"hello".to_vec())
///     .with_callback(|_: &KeeperClient, event: &KeeperEvent| -> KeeperResult<()> {
///         println!("created {:?}", event.name());
///         Ok(())
///     })
///     .for_path_in_background("/greeting")?;
///
/// client.close()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct KeeperClient {
    inner: Arc<ClientInner>,
    namespace: Namespace,
}

impl fmt::Debug for KeeperClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeeperClient")
            .field("state", &self.inner.lifecycle.get())
            .field("namespace", &self.namespace.name())
            .field("connection_state", &self.inner.connection_state.current())
            .field("pending_operations", &self.inner.background.len())
            .finish()
    }
}

impl KeeperClient {
    /// Start configuring a client
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Assemble the runtime and hand the session connector a watcher bound to it.
    pub(crate) fn new<F>(
        session_config: SessionConfig,
        config: ClientConfig,
        namespace: Namespace,
        connector: F,
    ) -> Self
    where
        F: FnOnce(SessionConfig, SessionWatcher) -> Arc<dyn SessionClient>,
    {
        let ClientConfig {
            auth,
            default_data,
            thread_name,
            ..
        } = config;

        let inner = Arc::new_cyclic(|weak: &Weak<ClientInner>| {
            let runtime = weak.clone();
            let watcher = SessionWatcher::new(move |event| {
                if let Some(inner) = runtime.upgrade() {
                    let namespace = inner.namespace.clone();
                    Self { inner, namespace }.process_watched_event(event);
                }
            });

            ClientInner {
                session: connector(session_config, watcher),
                lifecycle: Lifecycle::new(),
                listeners: ListenerContainer::new(),
                unhandled_error_listeners: ListenerContainer::new(),
                connection_state: ConnectionStateTracker::new(),
                background: BackgroundQueue::new(),
                auth_info: Mutex::new(auth),
                default_data,
                namespace: namespace.clone(),
                thread_name,
            }
        });

        Self { inner, namespace }
    }

    // ============================================================================
    // LIFECYCLE
    // ============================================================================

    /// Start the session, the connection state tracker and the background worker.
    ///
    /// A failure while starting the components is reported to the unhandled
    /// error listeners rather than returned. Calling this more than once fails
    /// with [`KeeperError::IllegalState`].
    pub fn start(&self) -> KeeperResult<()> {
        info!("Starting");
        if !self
            .inner
            .lifecycle
            .transition(LifecycleState::Latent, LifecycleState::Started)
        {
            let err = KeeperError::illegal_state("cannot be started more than once");
            error!("{}", err);
            return Err(err);
        }

        if let Err(e) = self.start_components() {
            self.handle_background_exception::<()>(None, e);
        }
        Ok(())
    }

    fn start_components(&self) -> KeeperResult<()> {
        self.inner.session.start_session()?;
        self.inner.connection_state.start()?;
        self.inner
            .background
            .spawn(self.root_view(), &self.inner.thread_name)
    }

    /// Shut the client down.
    ///
    /// Every event listener receives one [`KeeperEventType::Closing`] event,
    /// then all registries are cleared, the tracker and session are closed and
    /// the background worker is told to stop. Operations still queued are
    /// abandoned without a callback.
    pub fn close(&self) -> KeeperResult<()> {
        debug!("Closing");
        if !self
            .inner
            .lifecycle
            .transition(LifecycleState::Started, LifecycleState::Stopped)
        {
            let err = KeeperError::illegal_state(format!(
                "cannot close a client that is {}",
                self.inner.lifecycle.get()
            ));
            error!("{}", err);
            return Err(err);
        }

        let closing = KeeperEvent::closing();
        self.inner.listeners.dispatch(
            |listener| listener.event_received(self, &closing),
            |e| error!("Exception while sending Closing event: {}", e),
        );

        self.inner.listeners.clear();
        self.inner.unhandled_error_listeners.clear();
        self.inner.connection_state.close();
        if let Err(e) = self.inner.session.close_session() {
            error!("Closing the session failed: {}", e);
        }
        self.inner.background.shutdown();
        Ok(())
    }

    /// Whether the client has been started and not yet closed
    pub fn is_started(&self) -> bool {
        self.inner.lifecycle.is_started()
    }

    /// The client's lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.inner.lifecycle.get()
    }

    // ============================================================================
    // LISTENERS AND STATE
    // ============================================================================

    /// Listeners for completion events, watcher notifications and the close notice
    pub fn listenable(&self) -> &ListenerContainer<dyn EventListener> {
        &self.inner.listeners
    }

    /// Listeners for errors nothing else absorbed
    pub fn unhandled_error_listenable(&self) -> &ListenerContainer<dyn UnhandledErrorListener> {
        &self.inner.unhandled_error_listeners
    }

    /// Listeners for connection state transitions
    pub fn connection_state_listenable(&self) -> &ListenerContainer<dyn ConnectionStateListener> {
        self.inner.connection_state.listenable()
    }

    /// The most recently derived connection state
    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.inner.connection_state.current()
    }

    // ============================================================================
    // SESSION, NAMESPACE AND VIEWS
    // ============================================================================

    /// The underlying session client
    pub fn session(&self) -> &Arc<dyn SessionClient> {
        &self.inner.session
    }

    /// A synchronous retry loop driven by the session's retry policy
    pub fn new_retry_loop(&self) -> RetryLoop {
        self.inner.session.new_retry_loop()
    }

    /// This handle's namespace, if any
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.name()
    }

    /// Data used by creates that do not supply any
    pub fn default_data(&self) -> &[u8] {
        &self.inner.default_data
    }

    /// A handle sharing this runtime but applying no namespace.
    pub fn non_namespace_view(&self) -> KeeperResult<Self> {
        self.ensure_started()?;
        Ok(Self {
            inner: Arc::clone(&self.inner),
            namespace: Namespace::none(),
        })
    }

    /// An [`EnsurePath`] for `path` inside this handle's namespace.
    pub fn new_namespace_aware_ensure_path(&self, path: &str) -> EnsurePath {
        EnsurePath::new(self.fix_for_namespace(path))
    }

    /// Prefix `path` with the namespace, creating the namespace root first.
    ///
    /// If the root cannot be created the failure is escalated and
    /// [`VOID_PATH`] is returned.
    pub fn fix_for_namespace(&self, path: &str) -> String {
        if let Some(ensure) = self.namespace.ensure_path() {
            if let Err(e) = ensure.ensure(self.inner.session.as_ref()) {
                self.log_error("Ensure path threw exception", &e);
                return VOID_PATH.to_string();
            }
        }
        self.namespace.fix(path)
    }

    /// Strip the namespace prefix from `path`
    pub fn unfix_for_namespace(&self, path: &str) -> String {
        self.namespace.unfix(path)
    }

    pub(crate) fn namespace_handle(&self) -> &Namespace {
        &self.namespace
    }

    fn root_view(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            namespace: self.inner.namespace.clone(),
        }
    }

    pub(crate) fn ensure_started(&self) -> KeeperResult<()> {
        self.inner.lifecycle.ensure_started()
    }

    // ============================================================================
    // OPERATION FACTORIES
    // ============================================================================

    /// Create a node
    pub fn create(&self) -> KeeperResult<CreateBuilder> {
        self.ensure_started()?;
        Ok(CreateBuilder::new(self.clone()))
    }

    /// Delete a node
    pub fn delete(&self) -> KeeperResult<DeleteBuilder> {
        self.ensure_started()?;
        Ok(DeleteBuilder::new(self.clone()))
    }

    /// Check whether a node exists
    pub fn check_exists(&self) -> KeeperResult<ExistsBuilder> {
        self.ensure_started()?;
        Ok(ExistsBuilder::new(self.clone()))
    }

    /// Read a node's data
    pub fn get_data(&self) -> KeeperResult<GetDataBuilder> {
        self.ensure_started()?;
        Ok(GetDataBuilder::new(self.clone()))
    }

    /// Replace a node's data
    pub fn set_data(&self) -> KeeperResult<SetDataBuilder> {
        self.ensure_started()?;
        Ok(SetDataBuilder::new(self.clone()))
    }

    /// List a node's children
    pub fn get_children(&self) -> KeeperResult<GetChildrenBuilder> {
        self.ensure_started()?;
        Ok(GetChildrenBuilder::new(self.clone()))
    }

    /// Read a node's ACL
    pub fn get_acl(&self) -> KeeperResult<GetAclBuilder> {
        self.ensure_started()?;
        Ok(GetAclBuilder::new(self.clone()))
    }

    /// Replace a node's ACL
    pub fn set_acl(&self) -> KeeperResult<SetAclBuilder> {
        self.ensure_started()?;
        Ok(SetAclBuilder::new(self.clone()))
    }

    /// Flush the leader channel for `path` in the background.
    ///
    /// The completion is delivered to the event listeners as a
    /// [`KeeperEventType::Sync`] event carrying `context`.
    pub fn sync(&self, path: &str, context: Option<EventContext>) -> KeeperResult<()> {
        self.ensure_started()?;
        let path = self.fix_for_namespace(path);
        self.internal_sync(path, context);
        Ok(())
    }

    fn internal_sync(&self, path: String, context: Option<EventContext>) {
        let operation = sync_operation(self.namespace.clone(), path).with_context(context);
        self.inner.background.enqueue(operation);
    }

    // ============================================================================
    // BACKGROUND PIPELINE
    // ============================================================================

    /// Queue an operation for the background worker.
    pub fn submit_background<D: Send + 'static>(
        &self,
        operation: PendingOperation<D>,
    ) -> KeeperResult<()> {
        self.ensure_started()?;
        self.inner.background.enqueue(operation);
        Ok(())
    }

    /// Number of operations waiting in the background queue
    pub fn pending_background_operations(&self) -> usize {
        self.inner.background.len()
    }

    pub(crate) fn background(&self) -> &BackgroundQueue {
        &self.inner.background
    }

    pub(crate) fn take_auth_info(&self) -> Option<AuthInfo> {
        self.inner.auth_info.lock().take()
    }

    /// Route the outcome of one execution of `operation`.
    pub(crate) fn process_background_result<D: Send + 'static>(
        &self,
        operation: PendingOperation<D>,
        event: Option<KeeperEvent>,
    ) {
        let Some(event) = event else {
            self.inner.background.enqueue(operation);
            return;
        };

        if is_retryable_code(event.result_code()) {
            if let Some(operation) = self.allow_retry(operation) {
                debug!("Retrying operation after result {}", event.result_code());
                self.inner.background.enqueue(operation);
            } else {
                let error = KeeperError::from_result_code(event.result_code(), event.path());
                self.log_error("Background operation retry gave up", &error);
            }
            return;
        }

        if let Some(callback) = operation.callback() {
            let outcome = catch_unwind(AssertUnwindSafe(|| callback.process_result(self, &event)));
            let failure = match outcome {
                Ok(result) => result.err(),
                Err(panic) => Some(KeeperError::callback(format!(
                    "background callback panicked: {}",
                    panic_message(&*panic)
                ))),
            };
            if let Some(e) = failure {
                self.handle_background_exception(Some(operation), e);
            }
            return;
        }

        self.process_event(&event);
    }

    /// Retry `operation` if the error and the policy allow it, otherwise escalate.
    pub(crate) fn handle_background_exception<D: Send + 'static>(
        &self,
        operation: Option<PendingOperation<D>>,
        error: KeeperError,
    ) {
        if let Some(operation) = operation {
            if error.is_retryable() {
                debug!("Retry-able exception received: {}", error);
                match self.allow_retry(operation) {
                    Some(operation) => {
                        debug!("Retrying operation");
                        self.inner.background.enqueue(operation);
                        return;
                    }
                    None => debug!("Retry policy did not allow retry"),
                }
            }
        }

        self.log_error("Background exception was not retry-able or retry gave up", &error);
    }

    /// Consume a retry from `operation`'s budget; `None` when the policy refuses.
    fn allow_retry<D>(&self, mut operation: PendingOperation<D>) -> Option<PendingOperation<D>> {
        let policy = self.inner.session.retry_policy();
        if policy.allow_retry(operation.retry_count(), operation.elapsed()) {
            operation.increment_retry_count();
            Some(operation)
        } else {
            None
        }
    }

    /// Escalate an error nothing else absorbed.
    ///
    /// Session-loss errors force the connection state to LOST before the
    /// unhandled error listeners are notified.
    pub(crate) fn log_error(&self, reason: &str, error: &KeeperError) {
        let reason = if reason.is_empty() { "n/a" } else { reason };

        error!("{}: {}", reason, error);
        if error.is_session_loss() {
            self.inner
                .connection_state
                .add_state_change(self, ConnectionState::Lost);
        }

        self.inner.unhandled_error_listeners.dispatch(
            |listener| {
                listener.unhandled_error(reason, error);
                Ok(())
            },
            |e| error!("Exception while calling error listener: {}", e),
        );
    }

    // ============================================================================
    // EVENTS
    // ============================================================================

    fn process_watched_event(&self, mut event: WatchedEvent) {
        event.path = event.path.map(|path| self.unfix_for_namespace(&path));
        self.process_event(&KeeperEvent::watched(event));
    }

    fn process_event(&self, event: &KeeperEvent) {
        self.validate_connection(event);

        self.inner.listeners.dispatch(
            |listener| listener.event_received(self, event),
            |e| self.log_error("Event listener threw exception", &e),
        );
    }

    fn validate_connection(&self, event: &KeeperEvent) {
        if event.event_type() != KeeperEventType::Watched {
            return;
        }
        let Some(watched) = event.watched_event() else {
            return;
        };

        match watched.state {
            KeeperState::Disconnected => {
                self.inner
                    .connection_state
                    .add_state_change(self, ConnectionState::Suspended);
                // Forces a round trip so a quiet reconnect surfaces as a fresh state
                self.internal_sync(ROOT_PATH.to_string(), None);
            }
            KeeperState::Expired => {
                self.inner
                    .connection_state
                    .add_state_change(self, ConnectionState::Lost);
            }
            KeeperState::SyncConnected => {
                self.inner
                    .connection_state
                    .add_state_change(self, ConnectionState::Reconnected);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_client_is_send_sync() {
        _assert_send_sync::<KeeperClient>();
    }
}
