/*!
 * Table Admin
 *
 * Asynchronous administrative client for a remote tabular storage service,
 * the launcher seam it talks through, and an in-memory emulation of the
 * service.
 */

pub mod client;
pub mod launcher;
pub mod request;
pub mod service;
pub mod types;
pub mod validation;

pub use client::TableAdmin;
pub use launcher::{CallLauncher, RemoteCall};
pub use request::{AdminMethod, AdminRequest};
pub use service::{InMemoryAdminService, ServiceConfig};
pub use types::{ColumnFamily, ColumnFamilyModification, GcRule, Table, TableConfig, TableView};
