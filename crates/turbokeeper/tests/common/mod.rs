//! Shared test fixtures: a scripted in-memory session and recording listeners.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use turbokeeper::session::{
    Acl, CreateMode, KeeperError, KeeperResult, KeeperState, ResultCode, RetryNTimes, RetryPolicy,
    SessionClient, SessionConfig, SessionWatcher, Stat, WatchEventType, WatchedEvent,
};
use turbokeeper::{
    ClientBuilder, ConnectionState, ConnectionStateListener, EventListener, KeeperClient,
    KeeperEvent, UnhandledErrorListener,
};

/// How long a test waits for the worker thread before giving up
pub const TIMEOUT: Duration = Duration::from_secs(5);

/// How long a test waits to be reasonably sure something did NOT happen
pub const QUIET: Duration = Duration::from_millis(200);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// MOCK SESSION
// ============================================================================

/// One call made against the mock session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    StartSession,
    CloseSession,
    AddAuth { scheme: String, auth: Vec<u8> },
    Create { path: String, data: Vec<u8>, mode: CreateMode },
    Delete { path: String, version: i32 },
    Exists { path: String, watch: bool },
    GetData { path: String, watch: bool },
    SetData { path: String, data: Vec<u8>, version: i32 },
    GetChildren { path: String, watch: bool },
    GetAcl { path: String },
    SetAcl { path: String, version: i32 },
    Sync { path: String },
}

impl Call {
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Create { path, .. }
            | Self::Delete { path, .. }
            | Self::Exists { path, .. }
            | Self::GetData { path, .. }
            | Self::SetData { path, .. }
            | Self::GetChildren { path, .. }
            | Self::GetAcl { path }
            | Self::SetAcl { path, .. }
            | Self::Sync { path } => Some(path),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    data: Vec<u8>,
    acl: Vec<Acl>,
    stat: Stat,
}

/// An in-memory session with scriptable failures.
///
/// Remote calls operate on a small node tree. Errors pushed with
/// [`MockSession::fail_next`] are returned, in order, by the next remote calls
/// instead of touching the tree.
pub struct MockSession {
    policy: Mutex<Arc<dyn RetryPolicy>>,
    watcher: Mutex<Option<SessionWatcher>>,
    config: Mutex<Option<SessionConfig>>,
    nodes: Mutex<BTreeMap<String, Node>>,
    sequence: Mutex<u32>,
    failures: Mutex<VecDeque<KeeperError>>,
    start_failure: Mutex<Option<KeeperError>>,
    auth_failure: Mutex<Option<KeeperError>>,
    gate: Mutex<Option<Receiver<()>>>,
    history: Mutex<Vec<Call>>,
    calls_tx: Sender<Call>,
    calls_rx: Receiver<Call>,
}

impl fmt::Debug for MockSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockSession")
            .field("calls", &self.history.lock().len())
            .finish_non_exhaustive()
    }
}

impl MockSession {
    pub fn new() -> Arc<Self> {
        let (calls_tx, calls_rx) = unbounded();
        Arc::new(Self {
            policy: Mutex::new(Arc::new(RetryNTimes::new(3, Duration::ZERO))),
            watcher: Mutex::new(None),
            config: Mutex::new(None),
            nodes: Mutex::new(BTreeMap::new()),
            sequence: Mutex::new(0),
            failures: Mutex::new(VecDeque::new()),
            start_failure: Mutex::new(None),
            auth_failure: Mutex::new(None),
            gate: Mutex::new(None),
            history: Mutex::new(Vec::new()),
            calls_tx,
            calls_rx,
        })
    }

    /// A connector for [`ClientBuilder::build`] that wires this session in.
    ///
    /// The session adopts the builder's retry policy.
    pub fn connector(
        self: &Arc<Self>,
    ) -> impl FnOnce(SessionConfig, SessionWatcher) -> Arc<dyn SessionClient> + use<> {
        let session = Arc::clone(self);
        move |config, watcher| {
            *session.policy.lock() = Arc::clone(&config.retry_policy);
            *session.config.lock() = Some(config);
            *session.watcher.lock() = Some(watcher);
            session as Arc<dyn SessionClient>
        }
    }

    /// The configuration the runtime handed to the connector
    pub fn config(&self) -> Option<SessionConfig> {
        self.config.lock().clone()
    }

    /// Make the next remote call fail with `error`
    pub fn fail_next(&self, error: KeeperError) {
        self.failures.lock().push_back(error);
    }

    /// Make the next `count` remote calls fail with `code`
    pub fn fail_next_with(&self, code: ResultCode, count: usize) {
        for _ in 0..count {
            self.fail_next(KeeperError::remote(code));
        }
    }

    pub fn fail_start(&self, error: KeeperError) {
        *self.start_failure.lock() = Some(error);
    }

    pub fn fail_auth(&self, error: KeeperError) {
        *self.auth_failure.lock() = Some(error);
    }

    /// Block the next remote call until the returned sender is used or dropped.
    pub fn hold_next_call(&self) -> Sender<()> {
        let (release, gate) = crossbeam_channel::bounded(1);
        *self.gate.lock() = Some(gate);
        release
    }

    /// Deliver a raw watcher notification, as the session's event thread would
    pub fn notify(&self, event: WatchedEvent) {
        let watcher = self.watcher.lock().clone();
        if let Some(watcher) = watcher {
            watcher.notify(event);
        }
    }

    pub fn notify_state(&self, state: KeeperState) {
        self.notify(WatchedEvent::session(state));
    }

    pub fn notify_node(&self, event_type: WatchEventType, path: &str) {
        self.notify(WatchedEvent::new(
            event_type,
            KeeperState::SyncConnected,
            Some(path.to_string()),
        ));
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<Call> {
        self.history.lock().clone()
    }

    pub fn count_calls(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.history.lock().iter().filter(|c| predicate(c)).count()
    }

    /// Wait for a call matching `predicate`, skipping any other call.
    pub fn wait_for_call(&self, predicate: impl Fn(&Call) -> bool) -> Option<Call> {
        loop {
            match self.calls_rx.recv_timeout(TIMEOUT) {
                Ok(call) if predicate(&call) => return Some(call),
                Ok(_) => {}
                Err(_) => return None,
            }
        }
    }

    /// Seed a node directly, bypassing scripted failures
    pub fn seed(&self, path: &str, data: &[u8]) {
        self.nodes.lock().insert(
            path.to_string(),
            Node {
                data: data.to_vec(),
                acl: Acl::open_unsafe(),
                stat: Stat {
                    data_length: data.len() as i32,
                    ..Stat::default()
                },
            },
        );
    }

    pub fn node_data(&self, path: &str) -> Option<Vec<u8>> {
        self.nodes.lock().get(path).map(|n| n.data.clone())
    }

    pub fn has_node(&self, path: &str) -> bool {
        self.nodes.lock().contains_key(path)
    }

    fn record(&self, call: Call) {
        self.history.lock().push(call.clone());
        let _ = self.calls_tx.send(call);
    }

    fn remote<T>(
        &self,
        call: Call,
        operation: impl FnOnce(&mut BTreeMap<String, Node>) -> KeeperResult<T>,
    ) -> KeeperResult<T> {
        self.record(call);

        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            let _ = gate.recv_timeout(TIMEOUT);
        }

        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }
        operation(&mut self.nodes.lock())
    }

    fn exists_in(nodes: &BTreeMap<String, Node>, path: &str) -> bool {
        path == "/" || nodes.contains_key(path)
    }

    fn check_path(path: &str) -> KeeperResult<()> {
        if path.starts_with('/') && (path == "/" || !path.ends_with('/')) {
            Ok(())
        } else {
            Err(KeeperError::remote_at(ResultCode::BadArguments, path))
        }
    }

    fn parent_of(path: &str) -> &str {
        match path.rfind('/') {
            Some(0) | None => "/",
            Some(idx) => &path[..idx],
        }
    }

    fn children_of(nodes: &BTreeMap<String, Node>, path: &str) -> Vec<String> {
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{path}/")
        };
        nodes
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(str::to_string)
            .collect()
    }
}

impl SessionClient for MockSession {
    fn start_session(&self) -> KeeperResult<()> {
        self.record(Call::StartSession);
        match self.start_failure.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn close_session(&self) -> KeeperResult<()> {
        self.record(Call::CloseSession);
        Ok(())
    }

    fn session_id(&self) -> Option<i64> {
        Some(0x1234)
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn retry_policy(&self) -> Arc<dyn RetryPolicy> {
        Arc::clone(&self.policy.lock())
    }

    fn add_auth_info(&self, scheme: &str, auth: &[u8]) -> KeeperResult<()> {
        self.record(Call::AddAuth {
            scheme: scheme.to_string(),
            auth: auth.to_vec(),
        });
        match self.auth_failure.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn create(
        &self,
        path: &str,
        data: &[u8],
        acl: &[Acl],
        mode: CreateMode,
    ) -> KeeperResult<String> {
        let call = Call::Create {
            path: path.to_string(),
            data: data.to_vec(),
            mode,
        };
        self.remote(call, |nodes| {
            Self::check_path(path)?;
            if !Self::exists_in(nodes, Self::parent_of(path)) {
                return Err(KeeperError::remote_at(ResultCode::NoNode, path));
            }

            let actual = if mode.is_sequential() {
                let mut sequence = self.sequence.lock();
                let actual = format!("{path}{:010}", *sequence);
                *sequence += 1;
                actual
            } else {
                path.to_string()
            };
            if Self::exists_in(nodes, &actual) {
                return Err(KeeperError::remote_at(ResultCode::NodeExists, actual));
            }

            nodes.insert(
                actual.clone(),
                Node {
                    data: data.to_vec(),
                    acl: acl.to_vec(),
                    stat: Stat {
                        data_length: data.len() as i32,
                        ephemeral_owner: if mode.is_ephemeral() { 0x1234 } else { 0 },
                        ..Stat::default()
                    },
                },
            );
            Ok(actual)
        })
    }

    fn delete(&self, path: &str, version: i32) -> KeeperResult<()> {
        let call = Call::Delete {
            path: path.to_string(),
            version,
        };
        self.remote(call, |nodes| {
            let node = nodes
                .get(path)
                .ok_or_else(|| KeeperError::remote_at(ResultCode::NoNode, path))?;
            if version != -1 && node.stat.version != version {
                return Err(KeeperError::remote_at(ResultCode::BadVersion, path));
            }
            if !Self::children_of(nodes, path).is_empty() {
                return Err(KeeperError::remote_at(ResultCode::NotEmpty, path));
            }
            nodes.remove(path);
            Ok(())
        })
    }

    fn exists(&self, path: &str, watch: bool) -> KeeperResult<Option<Stat>> {
        let call = Call::Exists {
            path: path.to_string(),
            watch,
        };
        self.remote(call, |nodes| {
            Self::check_path(path)?;
            if path == "/" {
                return Ok(Some(Stat::default()));
            }
            Ok(nodes.get(path).map(|n| n.stat))
        })
    }

    fn get_data(&self, path: &str, watch: bool) -> KeeperResult<(Vec<u8>, Stat)> {
        let call = Call::GetData {
            path: path.to_string(),
            watch,
        };
        self.remote(call, |nodes| {
            nodes
                .get(path)
                .map(|n| (n.data.clone(), n.stat))
                .ok_or_else(|| KeeperError::remote_at(ResultCode::NoNode, path))
        })
    }

    fn set_data(&self, path: &str, data: &[u8], version: i32) -> KeeperResult<Stat> {
        let call = Call::SetData {
            path: path.to_string(),
            data: data.to_vec(),
            version,
        };
        self.remote(call, |nodes| {
            let node = nodes
                .get_mut(path)
                .ok_or_else(|| KeeperError::remote_at(ResultCode::NoNode, path))?;
            if version != -1 && node.stat.version != version {
                return Err(KeeperError::remote_at(ResultCode::BadVersion, path));
            }
            node.data = data.to_vec();
            node.stat.version += 1;
            node.stat.data_length = data.len() as i32;
            Ok(node.stat)
        })
    }

    fn get_children(&self, path: &str, watch: bool) -> KeeperResult<Vec<String>> {
        let call = Call::GetChildren {
            path: path.to_string(),
            watch,
        };
        self.remote(call, |nodes| {
            if !Self::exists_in(nodes, path) {
                return Err(KeeperError::remote_at(ResultCode::NoNode, path));
            }
            Ok(Self::children_of(nodes, path))
        })
    }

    fn get_acl(&self, path: &str) -> KeeperResult<(Vec<Acl>, Stat)> {
        let call = Call::GetAcl {
            path: path.to_string(),
        };
        self.remote(call, |nodes| {
            nodes
                .get(path)
                .map(|n| (n.acl.clone(), n.stat))
                .ok_or_else(|| KeeperError::remote_at(ResultCode::NoNode, path))
        })
    }

    fn set_acl(&self, path: &str, acl: &[Acl], version: i32) -> KeeperResult<Stat> {
        let call = Call::SetAcl {
            path: path.to_string(),
            version,
        };
        self.remote(call, |nodes| {
            let node = nodes
                .get_mut(path)
                .ok_or_else(|| KeeperError::remote_at(ResultCode::NoNode, path))?;
            if version != -1 && node.stat.aversion != version {
                return Err(KeeperError::remote_at(ResultCode::BadVersion, path));
            }
            node.acl = acl.to_vec();
            node.stat.aversion += 1;
            Ok(node.stat)
        })
    }

    fn sync(&self, path: &str) -> KeeperResult<()> {
        let call = Call::Sync {
            path: path.to_string(),
        };
        self.remote(call, |_| Ok(()))
    }
}

// ============================================================================
// CLIENT FIXTURES
// ============================================================================

pub fn build_client(session: &Arc<MockSession>, builder: ClientBuilder) -> KeeperClient {
    init_tracing();
    builder
        .build(session.connector())
        .expect("client should build")
}

pub fn started_client(session: &Arc<MockSession>, builder: ClientBuilder) -> KeeperClient {
    let client = build_client(session, builder);
    client.start().expect("client should start");
    client
}

pub fn retrying(max_retries: u32) -> ClientBuilder {
    ClientBuilder::new().with_retry_policy(Arc::new(RetryNTimes::new(max_retries, Duration::ZERO)))
}

// ============================================================================
// RECORDING LISTENERS
// ============================================================================

/// Forwards every event to a channel.
#[derive(Debug)]
pub struct EventRecorder {
    tx: Sender<KeeperEvent>,
}

impl EventRecorder {
    pub fn attach(client: &KeeperClient) -> Receiver<KeeperEvent> {
        let (tx, rx) = unbounded();
        client.listenable().add(Arc::new(Self { tx }));
        rx
    }
}

impl EventListener for EventRecorder {
    fn event_received(&self, _client: &KeeperClient, event: &KeeperEvent) -> KeeperResult<()> {
        let _ = self.tx.send(event.clone());
        Ok(())
    }
}

/// Forwards every unhandled error to a channel.
#[derive(Debug)]
pub struct ErrorRecorder {
    tx: Sender<(String, KeeperError)>,
}

impl ErrorRecorder {
    pub fn attach(client: &KeeperClient) -> Receiver<(String, KeeperError)> {
        let (tx, rx) = unbounded();
        client.unhandled_error_listenable().add(Arc::new(Self { tx }));
        rx
    }
}

impl UnhandledErrorListener for ErrorRecorder {
    fn unhandled_error(&self, message: &str, error: &KeeperError) {
        let _ = self.tx.send((message.to_string(), error.clone()));
    }
}

/// Forwards every connection state transition to a channel.
#[derive(Debug)]
pub struct StateRecorder {
    tx: Sender<ConnectionState>,
}

impl StateRecorder {
    pub fn attach(client: &KeeperClient) -> Receiver<ConnectionState> {
        let (tx, rx) = unbounded();
        client
            .connection_state_listenable()
            .add(Arc::new(Self { tx }));
        rx
    }
}

impl ConnectionStateListener for StateRecorder {
    fn state_changed(&self, _client: &KeeperClient, new_state: ConnectionState) {
        let _ = self.tx.send(new_state);
    }
}

/// Receive the next event of `event_type`, skipping others
pub fn next_event_of(
    rx: &Receiver<KeeperEvent>,
    event_type: turbokeeper::KeeperEventType,
) -> Option<KeeperEvent> {
    loop {
        match rx.recv_timeout(TIMEOUT) {
            Ok(event) if event.event_type() == event_type => return Some(event),
            Ok(_) => {}
            Err(_) => return None,
        }
    }
}
