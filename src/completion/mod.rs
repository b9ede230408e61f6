/*!
 * Asynchronous Completion Queue
 *
 * Lets many concurrent remote operations share one connection: each call is
 * registered as an operation record under a unique tag, the network layer
 * reports completion with `notify`, and a pool of worker threads running
 * `run` invokes every record's callback exactly once.
 *
 * Completions are delivered in the order the transport reports them, not in
 * issue order.
 */

mod queue;
mod record;
mod stats;
mod worker;

pub use queue::{CompletionQueue, QueueState};
pub use record::CompletionCallback;
pub use stats::QueueStatistics;
pub use worker::WorkerPool;
