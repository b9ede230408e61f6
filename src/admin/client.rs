/*!
 * Async Table Admin Client
 *
 * Issues administrative calls without blocking: every method validates its
 * arguments, serializes the request, registers an operation record on the
 * caller's completion queue and hands the call to the launcher. The reply is
 * decoded on a worker thread and forwarded to the caller's callback.
 *
 * Blocking wrappers at the bottom of the file build synchronous calls on top
 * of the async ones with a synchronization adapter. They must not be called
 * from a completion worker thread.
 */

use super::launcher::{CallLauncher, RemoteCall};
use super::request::{AdminMethod, AdminRequest};
use super::types::{ColumnFamilyModification, Table, TableConfig, TableView};
use super::validation::{
    validate_modifications, validate_table_config, validate_table_id, ValidationResult,
};
use crate::completion::CompletionQueue;
use crate::core::bincode as codec;
use crate::core::errors::{AdminError, AdminResult};
use crate::core::limits::DEFAULT_CALL_TIMEOUT;
use crate::core::types::{Status, Tag};
use crate::monitoring::span_call;
use crate::sync::{make_adapter, Setter};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Table administration client bound to one instance
#[derive(Clone)]
pub struct TableAdmin {
    launcher: Arc<dyn CallLauncher>,
    project_id: String,
    instance_id: String,
    instance_name: String,
    call_timeout: Option<Duration>,
}

impl TableAdmin {
    /// Create a client for `projects/{project_id}/instances/{instance_id}`
    pub fn new(
        launcher: Arc<dyn CallLauncher>,
        project_id: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> AdminResult<Self> {
        let project_id = project_id.into();
        let instance_id = instance_id.into();
        if project_id.is_empty() || instance_id.is_empty() {
            return Err(AdminError::InvalidArgument(
                "project id and instance id must not be empty".to_string(),
            ));
        }

        Ok(Self {
            instance_name: format!("projects/{}/instances/{}", project_id, instance_id),
            launcher,
            project_id,
            instance_id,
            call_timeout: Some(DEFAULT_CALL_TIMEOUT),
        })
    }

    /// Per-call timeout carried as the call deadline; `None` disables it
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    /// Fully qualified name of `table_id` in this instance
    pub fn table_name(&self, table_id: &str) -> String {
        format!("{}/tables/{}", self.instance_name, table_id)
    }

    // ========================================================================
    // Async operations
    // ========================================================================

    pub fn async_create_table<F>(
        &self,
        table_id: &str,
        config: TableConfig,
        cq: &CompletionQueue,
        callback: F,
    ) -> AdminResult<Tag>
    where
        F: FnOnce(&CompletionQueue, Table, Status) + Send + 'static,
    {
        let check = validate_table_id(table_id).and_then(|_| validate_table_config(&config));
        let request = AdminRequest::CreateTable {
            parent: self.instance_name.clone(),
            table_id: table_id.to_string(),
            config,
        };
        self.issue(cq, check, request, callback)
    }

    pub fn async_get_table<F>(
        &self,
        table_id: &str,
        view: TableView,
        cq: &CompletionQueue,
        callback: F,
    ) -> AdminResult<Tag>
    where
        F: FnOnce(&CompletionQueue, Table, Status) + Send + 'static,
    {
        let request = AdminRequest::GetTable {
            name: self.table_name(table_id),
            view,
        };
        self.issue(cq, validate_table_id(table_id), request, callback)
    }

    pub fn async_list_tables<F>(
        &self,
        view: TableView,
        cq: &CompletionQueue,
        callback: F,
    ) -> AdminResult<Tag>
    where
        F: FnOnce(&CompletionQueue, Vec<Table>, Status) + Send + 'static,
    {
        let request = AdminRequest::ListTables {
            parent: self.instance_name.clone(),
            view,
        };
        self.issue(cq, Ok(()), request, callback)
    }

    pub fn async_modify_column_families<F>(
        &self,
        table_id: &str,
        modifications: Vec<ColumnFamilyModification>,
        cq: &CompletionQueue,
        callback: F,
    ) -> AdminResult<Tag>
    where
        F: FnOnce(&CompletionQueue, Table, Status) + Send + 'static,
    {
        let check = validate_table_id(table_id).and_then(|_| validate_modifications(&modifications));
        let request = AdminRequest::ModifyColumnFamilies {
            name: self.table_name(table_id),
            modifications,
        };
        self.issue(cq, check, request, callback)
    }

    pub fn async_delete_table<F>(
        &self,
        table_id: &str,
        cq: &CompletionQueue,
        callback: F,
    ) -> AdminResult<Tag>
    where
        F: FnOnce(&CompletionQueue, (), Status) + Send + 'static,
    {
        let request = AdminRequest::DeleteTable {
            name: self.table_name(table_id),
        };
        self.issue(cq, validate_table_id(table_id), request, callback)
    }

    /// Validate, register and launch one call
    ///
    /// Invalid arguments are reported to the callback on the calling thread
    /// and never reach the queue.
    fn issue<T, F>(
        &self,
        cq: &CompletionQueue,
        check: ValidationResult,
        request: AdminRequest,
        callback: F,
    ) -> AdminResult<Tag>
    where
        T: DeserializeOwned + Default + Send + 'static,
        F: FnOnce(&CompletionQueue, T, Status) + Send + 'static,
    {
        let method = request.method();
        if let Err(reason) = check {
            debug!(method = %method, reason = %reason, "Rejecting admin call with invalid arguments");
            callback(cq, T::default(), Status::invalid_argument(reason.clone()));
            return Err(AdminError::InvalidArgument(reason));
        }

        let payload = request
            .encode()
            .map_err(|e| AdminError::Encoding(e.to_string()))?;

        let tag = cq.register(move |cq: &CompletionQueue, reply: Vec<u8>, status: Status| {
            let (response, status) = decode_reply::<T>(&reply, status);
            callback(cq, response, status);
        })?;

        let call = RemoteCall {
            tag,
            method,
            payload,
            deadline: self.call_timeout.and_then(|t| Instant::now().checked_add(t)),
        };

        debug!(tag = %tag, method = %method, "Starting admin call");
        if let Err(status) = self.launcher.start_call(call, cq.clone()) {
            warn!(tag = %tag, method = %method, status = %status, "Launcher refused admin call");
            if let Err(e) = cq.notify(tag, Vec::new(), status) {
                debug!(tag = %tag, error = %e, "Refusal not delivered; operation already completed");
            }
        }

        Ok(tag)
    }

    // ========================================================================
    // Blocking wrappers
    // ========================================================================

    pub fn create_table(
        &self,
        cq: &CompletionQueue,
        table_id: &str,
        config: TableConfig,
    ) -> Result<Table, Status> {
        blocking(AdminMethod::CreateTable, |setter| {
            self.async_create_table(table_id, config, cq, move |_, table, status| {
                resolve(&setter, table, status)
            })
        })
    }

    pub fn get_table(
        &self,
        cq: &CompletionQueue,
        table_id: &str,
        view: TableView,
    ) -> Result<Table, Status> {
        blocking(AdminMethod::GetTable, |setter| {
            self.async_get_table(table_id, view, cq, move |_, table, status| {
                resolve(&setter, table, status)
            })
        })
    }

    pub fn list_tables(&self, cq: &CompletionQueue, view: TableView) -> Result<Vec<Table>, Status> {
        blocking(AdminMethod::ListTables, |setter| {
            self.async_list_tables(view, cq, move |_, tables, status| {
                resolve(&setter, tables, status)
            })
        })
    }

    pub fn modify_column_families(
        &self,
        cq: &CompletionQueue,
        table_id: &str,
        modifications: Vec<ColumnFamilyModification>,
    ) -> Result<Table, Status> {
        blocking(AdminMethod::ModifyColumnFamilies, |setter| {
            self.async_modify_column_families(table_id, modifications, cq, move |_, table, status| {
                resolve(&setter, table, status)
            })
        })
    }

    pub fn delete_table(&self, cq: &CompletionQueue, table_id: &str) -> Result<(), Status> {
        blocking(AdminMethod::DeleteTable, |setter| {
            self.async_delete_table(table_id, cq, move |_, (), status| {
                resolve(&setter, (), status)
            })
        })
    }
}

/// Issue one async call and park the caller until its callback resolves it
fn blocking<T, I>(method: AdminMethod, issue: I) -> Result<T, Status>
where
    T: Send,
    I: FnOnce(Setter<T>) -> AdminResult<Tag>,
{
    let span = span_call(method.name());
    let result = {
        let _entered = span.enter();
        let (setter, waiter) = make_adapter();
        match issue(setter) {
            Ok(_) => waiter.get(),
            Err(e) => Err(issue_status(e)),
        }
    };
    span.finish(result)
}

/// Turn a raw reply into a typed response; errors yield `T::default()`
fn decode_reply<T: DeserializeOwned + Default>(reply: &[u8], status: Status) -> (T, Status) {
    if !status.is_ok() {
        return (T::default(), status);
    }
    match codec::from_slice::<T>(reply) {
        Ok(response) => (response, status),
        Err(e) => (T::default(), Status::unknown(format!("malformed reply: {}", e))),
    }
}

fn resolve<T>(setter: &Setter<T>, value: T, status: Status) {
    if status.is_ok() {
        setter.set_value(value);
    } else {
        setter.set_error(status);
    }
}

/// Message of the `CANCELLED` status a blocking wrapper returns when the call
/// was never issued because the completion queue is closed
///
/// Operations cancelled by a queue shutdown carry a different message.
pub const QUEUE_CLOSED_MESSAGE: &str = "call not issued: completion queue is closed";

/// Map a synchronous issue error onto the status a blocking wrapper returns
///
/// `InvalidArgument` keeps its reason, `QueueClosed` becomes `CANCELLED` with
/// [`QUEUE_CLOSED_MESSAGE`], encoding failures become `UNKNOWN`.
fn issue_status(err: AdminError) -> Status {
    match err {
        AdminError::InvalidArgument(reason) => Status::invalid_argument(reason),
        AdminError::QueueClosed => Status::cancelled(QUEUE_CLOSED_MESSAGE),
        AdminError::Encoding(reason) => Status::unknown(reason),
    }
}
