//! Background operation queue and worker
//!
//! Asynchronous operations are packaged as [`PendingOperation`]s and pushed
//! onto an unbounded queue drained by a single dedicated worker thread. The
//! worker executes one operation at a time in dequeue order and hands each
//! outcome to the client's result pipeline, which may put the same operation
//! back on the queue for another attempt.
//!
//! ## Architecture
//!
//! ```text
//! caller ──submit──▶ [ queue ] ──▶ worker thread
//!                        ▲            │ perform(client, op)
//!                        │            ▼
//!                        └── retry ── result pipeline ──▶ callback / listeners
//! ```
//!
//! Shutdown is a separate signal: the worker stops at its next dequeue and any
//! operation still queued, or submitted afterwards, is dropped.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, select, unbounded};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use turbokeeper_session::{KeeperError, KeeperResult};

use super::KeeperClient;
use crate::events::{EventContext, KeeperEvent};
use crate::listeners::panic_message;

/// The behavior of one kind of background operation.
///
/// `perform` runs on the worker thread. Returning `Ok(Some(event))` hands the
/// event to the result pipeline. Returning `Ok(None)` means the operation is
/// not finished yet and is re-queued as is. Returning `Err` routes the error
/// through the retry and escalation path.
pub trait BackgroundOperation<D>: Send + Sync {
    /// Execute once
    fn perform(
        &self,
        client: &KeeperClient,
        operation: &PendingOperation<D>,
    ) -> KeeperResult<Option<KeeperEvent>>;
}

impl<D, F> BackgroundOperation<D> for F
where
    F: Fn(&KeeperClient, &PendingOperation<D>) -> KeeperResult<Option<KeeperEvent>> + Send + Sync,
{
    fn perform(
        &self,
        client: &KeeperClient,
        operation: &PendingOperation<D>,
    ) -> KeeperResult<Option<KeeperEvent>> {
        self(client, operation)
    }
}

/// Receives the completion event of a background operation.
///
/// An error returned here is treated like an operation failure: retried if
/// retryable and allowed, escalated otherwise.
pub trait BackgroundCallback: Send + Sync {
    /// Handle the completion event
    fn process_result(&self, client: &KeeperClient, event: &KeeperEvent) -> KeeperResult<()>;
}

impl<F> BackgroundCallback for F
where
    F: Fn(&KeeperClient, &KeeperEvent) -> KeeperResult<()> + Send + Sync,
{
    fn process_result(&self, client: &KeeperClient, event: &KeeperEvent) -> KeeperResult<()> {
        self(client, event)
    }
}

/// One submitted background operation and its retry bookkeeping.
///
/// A pending operation is owned by exactly one place at a time: the queue, the
/// worker, or the result pipeline.
pub struct PendingOperation<D> {
    behavior: Box<dyn BackgroundOperation<D>>,
    data: D,
    callback: Option<Arc<dyn BackgroundCallback>>,
    context: Option<EventContext>,
    retry_count: u32,
    started: Instant,
}

impl<D> fmt::Debug for PendingOperation<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingOperation")
            .field("has_callback", &self.callback.is_some())
            .field("has_context", &self.context.is_some())
            .field("retry_count", &self.retry_count)
            .field("elapsed", &self.started.elapsed())
            .finish_non_exhaustive()
    }
}

impl<D> PendingOperation<D> {
    /// Package `behavior` with its input. The start time is taken now.
    pub fn new<B>(behavior: B, data: D) -> Self
    where
        B: BackgroundOperation<D> + 'static,
    {
        Self {
            behavior: Box::new(behavior),
            data,
            callback: None,
            context: None,
            retry_count: 0,
            started: Instant::now(),
        }
    }

    /// Deliver the completion event to `callback` instead of the event listeners
    #[must_use]
    pub fn with_callback(mut self, callback: Option<Arc<dyn BackgroundCallback>>) -> Self {
        self.callback = callback;
        self
    }

    /// Echo `context` back on the completion event
    #[must_use]
    pub fn with_context(mut self, context: Option<EventContext>) -> Self {
        self.context = context;
        self
    }

    /// The operation's input
    pub fn data(&self) -> &D {
        &self.data
    }

    /// The caller's context
    pub fn context(&self) -> Option<&EventContext> {
        self.context.as_ref()
    }

    /// Retries performed so far
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Time since the operation was first submitted
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn callback(&self) -> Option<Arc<dyn BackgroundCallback>> {
        self.callback.clone()
    }

    pub(crate) fn increment_retry_count(&mut self) {
        self.retry_count += 1;
    }
}

/// Type-erased queue entry.
pub(crate) trait QueuedOperation: Send {
    fn execute(self: Box<Self>, client: &KeeperClient);
}

impl<D: Send + 'static> QueuedOperation for PendingOperation<D> {
    fn execute(self: Box<Self>, client: &KeeperClient) {
        let operation = *self;
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            operation.behavior.perform(client, &operation)
        }));

        match outcome {
            Ok(Ok(event)) => client.process_background_result(operation, event),
            Ok(Err(error)) => client.handle_background_exception(Some(operation), error),
            Err(panic) => {
                let error = KeeperError::internal(format!(
                    "background operation panicked: {}",
                    panic_message(&*panic)
                ));
                client.handle_background_exception(Some(operation), error);
            }
        }
    }
}

type Entry = Box<dyn QueuedOperation>;

/// The queue and the worker thread that drains it.
pub(crate) struct BackgroundQueue {
    sender: Sender<Entry>,
    receiver: Receiver<Entry>,
    shutdown_tx: Sender<()>,
    shutdown_rx: Receiver<()>,
    stopped: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for BackgroundQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundQueue")
            .field("pending", &self.receiver.len())
            .field("stopped", &self.stopped.load(Ordering::Acquire))
            .finish()
    }
}

impl BackgroundQueue {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = unbounded();
        let (shutdown_tx, shutdown_rx) = unbounded();
        Self {
            sender,
            receiver,
            shutdown_tx,
            shutdown_rx,
            stopped: AtomicBool::new(false),
            worker: Mutex::new(None),
        }
    }

    /// Queue `operation`; dropped once the queue has been shut down.
    pub(crate) fn enqueue<D: Send + 'static>(&self, operation: PendingOperation<D>) {
        if self.is_stopped() {
            debug!("Background queue is stopped, operation dropped");
            return;
        }
        if self.sender.send(Box::new(operation)).is_err() {
            warn!("Background queue is disconnected, operation dropped");
            return;
        }
        // Lost a race with shutdown
        if self.is_stopped() {
            self.drain();
        }
    }

    /// Drop every queued operation without running it.
    fn drain(&self) -> usize {
        let abandoned = self.receiver.try_iter().count();
        if abandoned > 0 {
            debug!("Abandoned {} queued background operations", abandoned);
        }
        abandoned
    }

    pub(crate) fn len(&self) -> usize {
        self.receiver.len()
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Start the worker thread.
    pub(crate) fn spawn(&self, client: KeeperClient, thread_name: &str) -> KeeperResult<()> {
        let handle = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || run_worker(&client))
            .map_err(|e| KeeperError::internal(format!("failed to spawn background worker: {e}")))?;
        *self.worker.lock() = Some(handle);
        Ok(())
    }

    /// Signal the worker to stop and drop everything still queued.
    ///
    /// Does not wait for the worker, so this is safe to call from the worker
    /// thread itself.
    pub(crate) fn shutdown(&self) {
        self.stopped.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(());
        self.drain();
        if let Some(handle) = self.worker.lock().take() {
            debug!("Detached background worker {:?}", handle.thread().name());
        }
    }
}

fn run_worker(client: &KeeperClient) {
    info!("Background worker started");

    if let Some(auth) = client.take_auth_info() {
        if let Err(e) = client.session().add_auth_info(&auth.scheme, &auth.auth) {
            client.log_error("Adding auth info for background operations failed", &e);
            return;
        }
        debug!("Applied {} credentials", auth.scheme);
    }

    let queue = client.background();
    loop {
        let operation = select! {
            recv(queue.shutdown_rx) -> _ => break,
            recv(queue.receiver) -> entry => match entry {
                Ok(entry) => entry,
                Err(_) => break,
            },
        };

        if queue.is_stopped() {
            debug!("Worker stopping, abandoning dequeued operation");
            break;
        }
        operation.execute(client);
    }

    queue.drain();
    info!("Background worker terminated");
}
