/*!
 * Caller Synchronization Adapter
 *
 * One-shot setter/waiter pair that turns a completion callback into a
 * blocking (or awaitable) result for the issuing caller. Only the caller's
 * own thread blocks; worker threads never wait on an adapter.
 */

use crate::core::types::Status;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::warn;

/// Value or error delivered through an adapter
pub type Delivery<T> = Result<T, Status>;

/// Create a connected setter/waiter pair
pub fn make_adapter<T: Send>() -> (Setter<T>, Waiter<T>) {
    let (tx, rx) = flume::bounded(1);
    (
        Setter {
            tx,
            fulfilled: AtomicBool::new(false),
        },
        Waiter { rx },
    )
}

/// Write side of the adapter; moved into a completion callback
///
/// Must be used at most once. A second call trips a debug assertion; in
/// release builds the extra value is dropped. Dropping an unused setter
/// resolves the waiter with `CANCELLED`.
pub struct Setter<T> {
    tx: flume::Sender<Delivery<T>>,
    fulfilled: AtomicBool,
}

impl<T> Setter<T> {
    /// Deliver a successful value
    pub fn set_value(&self, value: T) {
        self.set(Ok(value));
    }

    /// Deliver an error
    pub fn set_error(&self, status: Status) {
        self.set(Err(status));
    }

    /// Deliver a value or error
    pub fn set(&self, delivery: Delivery<T>) {
        if self.fulfilled.swap(true, Ordering::AcqRel) {
            debug_assert!(false, "synchronization adapter set more than once");
            warn!("Synchronization adapter set more than once; value ignored");
            return;
        }
        // The waiter may have given up already; nothing to do then.
        let _ = self.tx.try_send(delivery);
    }

    /// Whether a value has been delivered
    pub fn is_fulfilled(&self) -> bool {
        self.fulfilled.load(Ordering::Acquire)
    }
}

/// Read side of the adapter; kept by the issuing caller
pub struct Waiter<T> {
    rx: flume::Receiver<Delivery<T>>,
}

impl<T> Waiter<T> {
    /// Block until the setter fires
    ///
    /// Returns exactly what was delivered. A setter dropped without a value
    /// yields `CANCELLED`.
    pub fn get(self) -> Delivery<T> {
        match self.rx.recv() {
            Ok(delivery) => delivery,
            Err(_) => Err(broken_promise()),
        }
    }

    /// Block for at most `timeout`
    ///
    /// Returns `DEADLINE_EXCEEDED` on expiry; the waiter stays usable.
    pub fn get_timeout(&self, timeout: Duration) -> Delivery<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(delivery) => delivery,
            Err(flume::RecvTimeoutError::Timeout) => Err(Status::deadline_exceeded(format!(
                "no result within {}ms",
                timeout.as_millis()
            ))),
            Err(flume::RecvTimeoutError::Disconnected) => Err(broken_promise()),
        }
    }

    /// Await the delivery from async code without blocking the executor
    pub async fn get_async(self) -> Delivery<T> {
        match self.rx.recv_async().await {
            Ok(delivery) => delivery,
            Err(_) => Err(broken_promise()),
        }
    }

    /// Whether a delivery is waiting to be read
    pub fn is_ready(&self) -> bool {
        !self.rx.is_empty()
    }
}

fn broken_promise() -> Status {
    Status::cancelled("synchronization adapter dropped before a value was set")
}
