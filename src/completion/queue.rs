/*!
 * Completion Queue
 *
 * Multiplexes the completions of many outstanding remote calls onto the
 * threads that execute `run`.
 *
 * ## Lifecycle
 *
 * ```text
 *   Active ──shutdown()──► ShuttingDown ──pending set empty, no callback running──► Drained
 *                               │
 *                               └─ grace period expired: every unnotified
 *                                  record is completed with CANCELLED
 * ```
 *
 * The pending map, the ready list and the lifecycle state sit behind one
 * mutex so that register, notify and lookup-and-remove are atomic with
 * respect to each other. Callbacks always run with the lock released.
 */

use super::record::{CompletionCallback, OperationRecord};
use super::stats::{QueueStatistics, QueueStats};
use crate::config::CompletionConfig;
use crate::core::errors::{CompletionError, CompletionResult};
use crate::core::id::{next_queue_id, TagGenerator};
use crate::core::limits::{DEFAULT_PENDING_CAPACITY, DEFAULT_SHUTDOWN_GRACE};
use crate::core::types::{Status, Tag};
use ahash::RandomState;
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Lifecycle of a completion queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Accepting registrations
    Active,
    /// No new registrations; pending records are still delivered
    ShuttingDown,
    /// Every registered record has been delivered
    Drained,
}

struct Inner {
    state: QueueState,
    /// When unnotified records get force-cancelled; `None` waits indefinitely
    cancel_at: Option<Instant>,
    pending: HashMap<Tag, OperationRecord, RandomState>,
    ready: VecDeque<Tag>,
    /// Records removed from `pending` whose callback has not returned yet
    in_flight: usize,
}

impl Inner {
    fn is_settled(&self) -> bool {
        self.pending.is_empty() && self.in_flight == 0
    }
}

struct Shared {
    tags: TagGenerator,
    inner: Mutex<Inner>,
    ready_cv: Condvar,
    stats: QueueStats,
    shutdown_grace: Duration,
}

/// Thread-safe completion queue
///
/// Cloning yields another handle to the same queue.
///
/// # Example
///
/// ```
/// use table_admin_cq::completion::CompletionQueue;
/// use table_admin_cq::core::Status;
/// use std::thread;
///
/// let cq = CompletionQueue::new();
/// let worker = {
///     let cq = cq.clone();
///     thread::spawn(move || cq.run())
/// };
///
/// let tag = cq
///     .register(|_cq, payload, status| {
///         assert!(status.is_ok());
///         assert_eq!(payload, b"reply".to_vec());
///     })
///     .unwrap();
/// cq.notify(tag, b"reply".to_vec(), Status::ok()).unwrap();
///
/// cq.shutdown();
/// worker.join().unwrap();
/// ```
#[derive(Clone)]
pub struct CompletionQueue {
    shared: Arc<Shared>,
}

impl CompletionQueue {
    /// Create a queue with the default shutdown grace period
    pub fn new() -> Self {
        Self::with_grace(DEFAULT_SHUTDOWN_GRACE)
    }

    /// Create a queue with a custom shutdown grace period
    pub fn with_grace(shutdown_grace: Duration) -> Self {
        let tags = TagGenerator::new(next_queue_id());
        debug!(
            queue = tags.queue_id(),
            grace_ms = shutdown_grace.as_millis() as u64,
            "Creating completion queue"
        );

        Self {
            shared: Arc::new(Shared {
                tags,
                inner: Mutex::new(Inner {
                    state: QueueState::Active,
                    cancel_at: None,
                    pending: HashMap::with_capacity_and_hasher(
                        DEFAULT_PENDING_CAPACITY,
                        RandomState::new(),
                    ),
                    ready: VecDeque::with_capacity(DEFAULT_PENDING_CAPACITY),
                    in_flight: 0,
                }),
                ready_cv: Condvar::new(),
                stats: QueueStats::default(),
                shutdown_grace,
            }),
        }
    }

    /// Create a queue from configuration
    pub fn from_config(config: &CompletionConfig) -> Self {
        Self::with_grace(config.shutdown_grace)
    }

    /// Process-unique id of this queue
    pub fn id(&self) -> u32 {
        self.shared.tags.queue_id()
    }

    /// Bind a callback to a fresh tag
    ///
    /// Fails with `QueueClosed` once `shutdown` has been called; the callback
    /// is dropped without being invoked in that case.
    pub fn register<F>(&self, callback: F) -> CompletionResult<Tag>
    where
        F: FnOnce(&CompletionQueue, Vec<u8>, Status) + Send + 'static,
    {
        self.register_boxed(Box::new(callback))
    }

    /// Bind an already boxed callback to a fresh tag
    pub fn register_boxed(&self, callback: CompletionCallback) -> CompletionResult<Tag> {
        let mut inner = self.shared.inner.lock();
        if inner.state != QueueState::Active {
            drop(inner);
            warn!(queue = self.id(), "Registration attempted on a closed completion queue");
            return Err(CompletionError::QueueClosed);
        }

        let tag = self.shared.tags.next();
        inner.pending.insert(tag, OperationRecord::new(tag, callback));
        drop(inner);

        QueueStats::bump(&self.shared.stats.registered);
        trace!(tag = %tag, "Operation registered");
        Ok(tag)
    }

    /// Report that the call behind `tag` finished
    ///
    /// Called by the network layer. Each tag accepts exactly one completion:
    /// a repeat is rejected with `AlreadyCompleted`, a tag this queue never
    /// issued with `UnknownTag`.
    pub fn notify(&self, tag: Tag, payload: Vec<u8>, status: Status) -> CompletionResult<()> {
        let accepted = self.fill(tag, payload, status)?;
        QueueStats::bump(&self.shared.stats.notified);
        trace!(tag = %tag, status = %accepted, "Completion enqueued");
        Ok(())
    }

    /// Complete a pending, not yet notified operation with `CANCELLED`
    pub fn cancel(&self, tag: Tag) -> CompletionResult<()> {
        self.fill(tag, Vec::new(), Status::cancelled("operation cancelled by caller"))?;
        QueueStats::bump(&self.shared.stats.cancelled);
        debug!(tag = %tag, "Operation cancelled");
        Ok(())
    }

    fn fill(&self, tag: Tag, payload: Vec<u8>, status: Status) -> CompletionResult<Status> {
        if tag.queue_id() != self.id() {
            QueueStats::bump(&self.shared.stats.rejected);
            warn!(tag = %tag, queue = self.id(), "Completion for a tag issued by another queue");
            return Err(CompletionError::UnknownTag(tag));
        }

        let mut inner = self.shared.inner.lock();
        let outcome = match inner.pending.get_mut(&tag) {
            Some(record) => {
                if record.fill(payload, status.clone()) {
                    inner.ready.push_back(tag);
                    Ok(status)
                } else {
                    Err(CompletionError::AlreadyCompleted(tag))
                }
            }
            // Tags are minted under this lock, so anything at or below the
            // counter that is not pending has already been delivered.
            None if tag.sequence() <= self.shared.tags.issued() => {
                Err(CompletionError::AlreadyCompleted(tag))
            }
            None => Err(CompletionError::UnknownTag(tag)),
        };
        drop(inner);

        match outcome {
            Ok(status) => {
                self.shared.ready_cv.notify_one();
                Ok(status)
            }
            Err(err) => {
                QueueStats::bump(&self.shared.stats.rejected);
                debug!(tag = %tag, error = %err, "Completion rejected");
                Err(err)
            }
        }
    }

    /// Blocking completion loop for worker threads
    ///
    /// Waits for the next completion, removes its record from the pending set
    /// and invokes the callback on this thread. Returns once the queue is
    /// drained. Any number of threads may run this concurrently.
    pub fn run(&self) {
        debug!(queue = self.id(), "Completion loop started");
        while let Some(record) = self.next_record() {
            self.deliver(record);
            self.finish_delivery();
        }
        debug!(queue = self.id(), "Completion loop finished");
    }

    /// Wait for the next deliverable record; `None` once drained
    fn next_record(&self) -> Option<OperationRecord> {
        let mut inner = self.shared.inner.lock();
        loop {
            if let Some(tag) = inner.ready.pop_front() {
                if let Some(record) = inner.pending.remove(&tag) {
                    inner.in_flight += 1;
                    return Some(record);
                }
                continue;
            }

            match inner.state {
                QueueState::Active => self.shared.ready_cv.wait(&mut inner),
                QueueState::ShuttingDown => {
                    if inner.is_settled() {
                        self.mark_drained(&mut inner);
                        return None;
                    }
                    if inner.pending.is_empty() {
                        // Last callbacks still running on other workers
                        self.shared.ready_cv.wait(&mut inner);
                        continue;
                    }
                    match inner.cancel_at {
                        Some(at) if Instant::now() >= at => {
                            let cancelled = Self::cancel_unnotified(&mut inner);
                            if cancelled > 0 {
                                self.shared
                                    .stats
                                    .cancelled
                                    .fetch_add(cancelled, std::sync::atomic::Ordering::Relaxed);
                                info!(
                                    queue = self.id(),
                                    cancelled = cancelled,
                                    "Shutdown grace expired, cancelling outstanding operations"
                                );
                                self.shared.ready_cv.notify_all();
                            } else {
                                // Everything left is on the ready list or in a callback
                                // elsewhere; wait for the pending set to empty.
                                self.shared.ready_cv.wait(&mut inner);
                            }
                        }
                        Some(at) => {
                            self.shared.ready_cv.wait_until(&mut inner, at);
                        }
                        None => self.shared.ready_cv.wait(&mut inner),
                    }
                }
                QueueState::Drained => return None,
            }
        }
    }

    /// Account for a callback that has returned
    fn finish_delivery(&self) {
        let mut inner = self.shared.inner.lock();
        inner.in_flight = inner.in_flight.saturating_sub(1);
        if inner.state == QueueState::ShuttingDown && inner.is_settled() {
            self.mark_drained(&mut inner);
        }
    }

    fn mark_drained(&self, inner: &mut Inner) {
        if inner.state != QueueState::Drained {
            inner.state = QueueState::Drained;
            info!(queue = self.id(), "Completion queue drained");
        }
        self.shared.ready_cv.notify_all();
    }

    /// Complete every record that has no completion yet with CANCELLED
    fn cancel_unnotified(inner: &mut Inner) -> u64 {
        let mut tags: Vec<Tag> = inner
            .pending
            .values()
            .filter(|record| !record.is_notified())
            .map(|record| record.tag())
            .collect();
        tags.sort_unstable();

        for tag in &tags {
            if let Some(record) = inner.pending.get_mut(tag) {
                record.fill(
                    Vec::new(),
                    Status::cancelled("completion queue shut down before the call completed"),
                );
                inner.ready.push_back(*tag);
            }
        }
        tags.len() as u64
    }

    fn deliver(&self, record: OperationRecord) {
        let tag = record.tag();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| record.complete(self)));
        QueueStats::bump(&self.shared.stats.delivered);

        if outcome.is_err() {
            error!(tag = %tag, "Completion callback panicked");
        } else {
            trace!(tag = %tag, "Completion delivered");
        }
    }

    /// Stop accepting registrations and let pending work drain
    ///
    /// Wakes every thread blocked in `run`. Real completions are accepted for
    /// the configured grace period; after that, unnotified operations are
    /// delivered as CANCELLED. Calling it again has no further effect.
    pub fn shutdown(&self) {
        self.begin_shutdown(self.shared.shutdown_grace);
    }

    /// Shut down without a grace period
    ///
    /// Outstanding operations are cancelled as soon as a worker observes the
    /// state change. Tightens the deadline of an earlier `shutdown`.
    pub fn shutdown_now(&self) {
        self.begin_shutdown(Duration::ZERO);
    }

    fn begin_shutdown(&self, grace: Duration) {
        let mut inner = self.shared.inner.lock();
        let cancel_at = Instant::now().checked_add(grace);

        match inner.state {
            QueueState::Drained => return,
            QueueState::ShuttingDown => {
                inner.cancel_at = match (inner.cancel_at, cancel_at) {
                    (Some(current), Some(new)) => Some(current.min(new)),
                    (current, new) => current.or(new),
                };
            }
            QueueState::Active => {
                let pending = inner.pending.len();
                info!(
                    queue = self.id(),
                    pending = pending,
                    in_flight = inner.in_flight,
                    "Completion queue shutting down"
                );
                if inner.is_settled() {
                    inner.state = QueueState::Drained;
                } else {
                    inner.state = QueueState::ShuttingDown;
                    inner.cancel_at = cancel_at;
                }
            }
        }
        drop(inner);

        self.shared.ready_cv.notify_all();
    }

    /// Current lifecycle state
    pub fn state(&self) -> QueueState {
        self.shared.inner.lock().state
    }

    /// Whether `shutdown` has been called
    pub fn is_shutdown(&self) -> bool {
        self.state() != QueueState::Active
    }

    /// Number of records still owned by the queue
    pub fn pending(&self) -> usize {
        self.shared.inner.lock().pending.len()
    }

    /// Statistics snapshot
    pub fn stats(&self) -> QueueStatistics {
        let pending = self.pending();
        self.shared.stats.snapshot(pending)
    }
}

impl Default for CompletionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CompletionQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("CompletionQueue")
            .field("id", &self.id())
            .field("state", &inner.state)
            .field("pending", &inner.pending.len())
            .field("ready", &inner.ready.len())
            .field("in_flight", &inner.in_flight)
            .finish()
    }
}
