//! Lifecycle tests: start/close ordering, the close broadcast and start failures

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{
    Call, ErrorRecorder, EventRecorder, MockSession, QUIET, TIMEOUT, build_client, started_client,
};
use turbokeeper::session::{KeeperError, ResultCode};
use turbokeeper::{
    ClientBuilder, EventListener, KeeperClient, KeeperEvent, KeeperEventType, KeeperResult,
    LifecycleState,
};

#[derive(Debug, Default)]
struct CountingListener {
    closing: AtomicUsize,
}

impl EventListener for CountingListener {
    fn event_received(&self, _client: &KeeperClient, event: &KeeperEvent) -> KeeperResult<()> {
        if event.event_type() == KeeperEventType::Closing {
            self.closing.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[derive(Debug)]
struct FailingListener;

impl EventListener for FailingListener {
    fn event_received(&self, _client: &KeeperClient, _event: &KeeperEvent) -> KeeperResult<()> {
        Err(KeeperError::internal("listener refuses every event"))
    }
}

#[derive(Debug)]
struct PanickingListener;

impl EventListener for PanickingListener {
    fn event_received(&self, _client: &KeeperClient, _event: &KeeperEvent) -> KeeperResult<()> {
        panic!("listener blew up")
    }
}

#[test]
fn test_start_then_close() {
    let session = MockSession::new();
    let client = build_client(&session, ClientBuilder::new());

    assert_eq!(client.state(), LifecycleState::Latent);
    assert!(!client.is_started());

    client.start().unwrap();
    assert!(client.is_started());
    assert_eq!(client.state(), LifecycleState::Started);

    client.close().unwrap();
    assert_eq!(client.state(), LifecycleState::Stopped);
    assert_eq!(session.calls(), vec![Call::StartSession, Call::CloseSession]);
}

#[test]
fn test_start_twice_is_usage_error() {
    let session = MockSession::new();
    let client = started_client(&session, ClientBuilder::new());

    let err = client.start().unwrap_err();
    assert!(err.is_illegal_state());
    assert_eq!(client.state(), LifecycleState::Started);
    assert_eq!(
        session.count_calls(|c| *c == Call::StartSession),
        1,
        "second start must not touch the session"
    );

    client.close().unwrap();
}

#[test]
fn test_close_before_start_is_usage_error() {
    let session = MockSession::new();
    let client = build_client(&session, ClientBuilder::new());

    let err = client.close().unwrap_err();
    assert!(err.is_illegal_state());
    assert_eq!(client.state(), LifecycleState::Latent);
    assert!(session.calls().is_empty());

    // Still startable afterwards
    client.start().unwrap();
    client.close().unwrap();
}

#[test]
fn test_close_twice_is_usage_error() {
    let session = MockSession::new();
    let client = started_client(&session, ClientBuilder::new());

    client.close().unwrap();
    let err = client.close().unwrap_err();
    assert!(err.is_illegal_state());
    assert_eq!(session.count_calls(|c| *c == Call::CloseSession), 1);
}

#[test]
fn test_operations_require_started_client() {
    let session = MockSession::new();
    let client = build_client(&session, ClientBuilder::new());

    assert!(client.create().unwrap_err().is_illegal_state());
    assert!(client.delete().unwrap_err().is_illegal_state());
    assert!(client.check_exists().unwrap_err().is_illegal_state());
    assert!(client.get_data().unwrap_err().is_illegal_state());
    assert!(client.set_data().unwrap_err().is_illegal_state());
    assert!(client.get_children().unwrap_err().is_illegal_state());
    assert!(client.get_acl().unwrap_err().is_illegal_state());
    assert!(client.set_acl().unwrap_err().is_illegal_state());
    assert!(client.sync("/", None).unwrap_err().is_illegal_state());
    assert!(client.non_namespace_view().unwrap_err().is_illegal_state());

    client.start().unwrap();
    client.close().unwrap();
    assert!(client.create().unwrap_err().is_illegal_state());
}

#[test]
fn test_close_broadcasts_closing_to_every_listener_even_when_one_fails() {
    let session = MockSession::new();
    let client = started_client(&session, ClientBuilder::new());

    let first = Arc::new(CountingListener::default());
    let last = Arc::new(CountingListener::default());
    client.listenable().add(first.clone());
    client.listenable().add(Arc::new(FailingListener));
    client.listenable().add(Arc::new(PanickingListener));
    client.listenable().add(last.clone());
    let errors = ErrorRecorder::attach(&client);

    client.close().unwrap();

    assert_eq!(first.closing.load(Ordering::SeqCst), 1);
    assert_eq!(last.closing.load(Ordering::SeqCst), 1);
    // Failures during the close broadcast are logged, not escalated
    assert!(errors.recv_timeout(QUIET).is_err());
}

#[test]
fn test_close_clears_registries() {
    let session = MockSession::new();
    let client = started_client(&session, ClientBuilder::new());

    let events = EventRecorder::attach(&client);
    ErrorRecorder::attach(&client);
    common::StateRecorder::attach(&client);

    client.close().unwrap();

    let closing = events.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(closing.event_type(), KeeperEventType::Closing);
    assert!(client.listenable().is_empty());
    assert!(client.unhandled_error_listenable().is_empty());
    assert!(client.connection_state_listenable().is_empty());
}

#[test]
fn test_start_failure_is_reported_as_unhandled_error() {
    let session = MockSession::new();
    session.fail_start(KeeperError::internal("cannot reach ensemble"));
    let client = build_client(&session, ClientBuilder::new());
    let errors = ErrorRecorder::attach(&client);

    // The failure does not surface from start() itself
    client.start().unwrap();
    assert!(client.is_started());

    let (_, error) = errors.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(error, KeeperError::internal("cannot reach ensemble"));
    assert!(errors.recv_timeout(QUIET).is_err());

    client.close().unwrap();
}

#[test]
fn test_session_loss_during_start_is_escalated_without_state() {
    let session = MockSession::new();
    session.fail_start(KeeperError::remote(ResultCode::ConnectionLoss));
    let client = build_client(&session, ClientBuilder::new());
    let errors = ErrorRecorder::attach(&client);

    client.start().unwrap();

    let (_, error) = errors.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(error.code(), Some(ResultCode::ConnectionLoss));
    // The tracker was never started, so no state could be recorded
    assert_eq!(client.connection_state(), None);

    client.close().unwrap();
}
