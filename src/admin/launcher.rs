/*!
 * Call Launcher
 * Seam between the admin client and whatever carries calls to the service
 */

use super::request::AdminMethod;
use crate::completion::CompletionQueue;
use crate::core::types::{Status, Tag};
use std::time::Instant;

/// A call ready to be sent
#[derive(Debug, Clone)]
pub struct RemoteCall {
    /// Tag to report back through `CompletionQueue::notify`
    pub tag: Tag,
    pub method: AdminMethod,
    /// Serialized `AdminRequest`
    pub payload: Vec<u8>,
    pub deadline: Option<Instant>,
}

impl RemoteCall {
    pub fn is_expired(&self) -> bool {
        self.deadline.map_or(false, |d| Instant::now() >= d)
    }
}

/// Starts remote calls and reports their completion to the queue
///
/// Implementations must eventually call `queue.notify(call.tag, ..)` exactly
/// once for every call they accept. Returning an error means the call was
/// never started; the client then delivers that status through the callback.
pub trait CallLauncher: Send + Sync {
    fn start_call(&self, call: RemoteCall, queue: CompletionQueue) -> Result<(), Status>;
}
