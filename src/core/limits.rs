/*!
 * Limits and Constants
 *
 * Defaults and validation bounds for the completion queue, the worker pool
 * and the admin client. Grouped by subsystem.
 */

use std::time::Duration;

// =============================================================================
// COMPLETION QUEUE
// =============================================================================

/// Time real completions may still arrive after shutdown (5s)
/// Pending records still unnotified when it expires are delivered as CANCELLED
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Initial capacity of the pending-record map
pub const DEFAULT_PENDING_CAPACITY: usize = 64;

// =============================================================================
// WORKER POOL
// =============================================================================

/// Default number of threads running the completion loop
pub const DEFAULT_WORKER_THREADS: usize = 1;

/// Upper bound accepted from configuration
pub const MAX_WORKER_THREADS: usize = 256;

/// Thread name prefix for pool workers
pub const DEFAULT_WORKER_THREAD_NAME: &str = "cq-worker";

// =============================================================================
// ADMIN CLIENT
// =============================================================================

/// Maximum table id length accepted by the service
pub const MAX_TABLE_ID_LEN: usize = 50;

/// Maximum column family id length
pub const MAX_COLUMN_FAMILY_ID_LEN: usize = 64;

/// Default per-call timeout (30s)
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of in-memory service threads
pub const DEFAULT_SERVICE_THREADS: usize = 2;
