/*!
 * Table Admin Completion Queue
 *
 * Completion-queue runtime for asynchronous table administration calls,
 * the admin client built on it, and an in-memory service emulator.
 */

pub mod admin;
pub mod completion;
pub mod config;
pub mod core;
pub mod monitoring;
pub mod sync;

// Re-exports
pub use admin::{
    CallLauncher, ColumnFamily, ColumnFamilyModification, GcRule, InMemoryAdminService,
    RemoteCall, ServiceConfig, Table, TableAdmin, TableConfig, TableView,
};
pub use completion::{CompletionQueue, QueueState, QueueStatistics, WorkerPool};
pub use config::CompletionConfig;
pub use crate::core::{
    random_table_id, AdminError, AdminResult, CompletionError, CompletionResult, ConfigError,
    Status, StatusCode, Tag,
};
pub use monitoring::init_tracing;
pub use sync::{make_adapter, Setter, Waiter};
