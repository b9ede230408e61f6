/*!
 * Synchronization Adapters
 *
 * Bridges from callback delivery to blocking or async waits for callers that
 * want synchronous semantics on top of the completion queue.
 */

mod promise;

pub use promise::{make_adapter, Delivery, Setter, Waiter};
