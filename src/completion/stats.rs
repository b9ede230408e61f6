/*!
 * Queue Statistics
 * Lock-free counters for completion queue activity
 */

use std::sync::atomic::{AtomicU64, Ordering};

/// Queue counters
///
/// Cache-line aligned to prevent false sharing
#[repr(C, align(64))]
#[derive(Default)]
pub(crate) struct QueueStats {
    pub(crate) registered: AtomicU64,
    pub(crate) notified: AtomicU64,
    pub(crate) delivered: AtomicU64,
    pub(crate) cancelled: AtomicU64,
    pub(crate) rejected: AtomicU64,
}

impl QueueStats {
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, pending: usize) -> QueueStatistics {
        QueueStatistics {
            registered: self.registered.load(Ordering::Relaxed),
            notified: self.notified.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            pending,
        }
    }
}

/// Public statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStatistics {
    /// Records registered
    pub registered: u64,
    /// Completions accepted from the network layer
    pub notified: u64,
    /// Callbacks invoked
    pub delivered: u64,
    /// Records completed with a cancellation
    pub cancelled: u64,
    /// Notifications refused (unknown or duplicate tag)
    pub rejected: u64,
    /// Records still owned by the queue
    pub pending: usize,
}
