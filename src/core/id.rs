/*!
 * ID Generation
 * Queue ids, monotonically issued completion tags and random resource ids
 */

use super::types::Tag;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use uuid::Uuid;

/// Process-wide counter for completion queue ids
static NEXT_QUEUE_ID: AtomicU32 = AtomicU32::new(1);

/// Allocate a process-unique queue id
#[inline]
pub(crate) fn next_queue_id() -> u32 {
    NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Monotonic tag generator owned by a single completion queue
///
/// # Performance
/// - Cache-line aligned to prevent false sharing with queue state
/// - Lock-free atomic increment
#[repr(C, align(64))]
pub(crate) struct TagGenerator {
    queue: u32,
    counter: AtomicU64,
}

impl TagGenerator {
    pub(crate) fn new(queue: u32) -> Self {
        Self {
            queue,
            counter: AtomicU64::new(1),
        }
    }

    /// Mint the next tag; never returns the same tag twice
    #[inline]
    pub(crate) fn next(&self) -> Tag {
        Tag::new(self.queue, self.counter.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub(crate) fn queue_id(&self) -> u32 {
        self.queue
    }

    /// Number of tags issued so far
    #[inline]
    pub(crate) fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed) - 1
    }
}

/// Generate a random table id with the given prefix
///
/// The result always satisfies the table id rules enforced by the admin client.
pub fn random_table_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &suffix[..12])
}
