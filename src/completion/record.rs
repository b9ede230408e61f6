/*!
 * Operation Record
 * Per-call state owned by the completion queue while the call is pending
 */

use super::queue::CompletionQueue;
use crate::core::types::{Status, Tag};
use std::fmt;

/// Type-erased completion callback
///
/// Receives the queue, the raw reply payload and the terminal status.
pub type CompletionCallback = Box<dyn FnOnce(&CompletionQueue, Vec<u8>, Status) + Send + 'static>;

/// State of one pending call
///
/// The status slot doubles as the "notified" marker: a record whose status is
/// set is already on the ready list and must not accept another completion.
pub(crate) struct OperationRecord {
    tag: Tag,
    response: Vec<u8>,
    status: Option<Status>,
    callback: CompletionCallback,
}

impl OperationRecord {
    pub(crate) fn new(tag: Tag, callback: CompletionCallback) -> Self {
        Self {
            tag,
            response: Vec::new(),
            status: None,
            callback,
        }
    }

    #[inline]
    pub(crate) fn tag(&self) -> Tag {
        self.tag
    }

    /// Whether a completion (real or cancellation) has been recorded
    #[inline]
    pub(crate) fn is_notified(&self) -> bool {
        self.status.is_some()
    }

    /// Store the reply; returns false if a completion was already recorded
    pub(crate) fn fill(&mut self, payload: Vec<u8>, status: Status) -> bool {
        if self.status.is_some() {
            return false;
        }
        self.response = payload;
        self.status = Some(status);
        true
    }

    /// Consume the record and run its callback on the current thread
    pub(crate) fn complete(self, queue: &CompletionQueue) {
        let status = self
            .status
            .unwrap_or_else(|| Status::unknown("completed without a status"));
        (self.callback)(queue, self.response, status);
    }
}

impl fmt::Debug for OperationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRecord")
            .field("tag", &self.tag)
            .field("response_len", &self.response.len())
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
