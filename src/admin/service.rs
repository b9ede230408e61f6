/*!
 * In-memory Admin Service
 *
 * Emulates the remote table admin service for tests and the demo binary.
 * Calls are queued on a flume channel and executed by a small set of service
 * threads, which report every result back through `CompletionQueue::notify`
 * just like a network transport would.
 */

use super::launcher::{CallLauncher, RemoteCall};
use super::request::AdminRequest;
use super::types::{ColumnFamily, ColumnFamilyModification, Table, TableView};
use crate::completion::CompletionQueue;
use crate::core::bincode as codec;
use crate::core::limits::DEFAULT_SERVICE_THREADS;
use crate::core::types::Status;
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, info_span, warn};

/// Emulator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Number of service threads executing calls
    pub threads: usize,
    /// Artificial latency added before each call executes
    pub latency: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_SERVICE_THREADS,
            latency: Duration::ZERO,
        }
    }
}

struct Job {
    call: RemoteCall,
    queue: CompletionQueue,
}

struct ServiceState {
    tables: DashMap<String, Table, RandomState>,
    faults: Mutex<VecDeque<Status>>,
    latency: Duration,
    calls: AtomicU64,
}

type Reply = Result<Vec<u8>, Status>;

/// Call launcher backed by an in-process table store
pub struct InMemoryAdminService {
    sender: Mutex<Option<flume::Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    state: Arc<ServiceState>,
}

impl InMemoryAdminService {
    pub fn new(config: ServiceConfig) -> Self {
        let (tx, rx) = flume::unbounded::<Job>();
        let state = Arc::new(ServiceState {
            tables: DashMap::with_hasher(RandomState::new()),
            faults: Mutex::new(VecDeque::new()),
            latency: config.latency,
            calls: AtomicU64::new(0),
        });

        let threads = config.threads.max(1);
        let mut handles = Vec::with_capacity(threads);
        for index in 0..threads {
            let rx = rx.clone();
            let state = state.clone();
            let spawned = thread::Builder::new()
                .name(format!("admin-svc-{}", index))
                .spawn(move || {
                    let span = info_span!("admin_service", worker = index);
                    let _guard = span.enter();
                    while let Ok(job) = rx.recv() {
                        state.execute(job);
                    }
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => warn!(worker = index, error = %e, "Failed to spawn service thread"),
            }
        }

        info!(threads = handles.len(), "In-memory admin service started");
        Self {
            sender: Mutex::new(Some(tx)),
            handles: Mutex::new(handles),
            state,
        }
    }

    /// Fail the next call with `status` (queued faults apply in order)
    pub fn inject_fault(&self, status: Status) {
        self.state.faults.lock().push_back(status);
    }

    /// Number of calls executed so far
    pub fn calls(&self) -> u64 {
        self.state.calls.load(Ordering::Relaxed)
    }

    /// Number of tables across all instances
    pub fn table_count(&self) -> usize {
        self.state.tables.len()
    }

    /// Stop accepting calls and join the service threads
    ///
    /// Calls already queued are still executed and notified. Returns the
    /// number of service threads that exited by panicking; repeat calls
    /// return 0.
    pub fn shutdown(&self) -> usize {
        if self.sender.lock().take().is_none() {
            return 0;
        }
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        let mut panicked = 0;
        for handle in handles {
            if handle.join().is_err() {
                panicked += 1;
            }
        }
        if panicked > 0 {
            warn!(panicked = panicked, "Admin service threads panicked");
        } else {
            info!("In-memory admin service stopped");
        }
        panicked
    }
}

impl Default for InMemoryAdminService {
    fn default() -> Self {
        Self::new(ServiceConfig::default())
    }
}

impl Drop for InMemoryAdminService {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

impl CallLauncher for InMemoryAdminService {
    fn start_call(&self, call: RemoteCall, queue: CompletionQueue) -> Result<(), Status> {
        let sender = self.sender.lock();
        let sender = sender
            .as_ref()
            .ok_or_else(|| Status::unavailable("admin service is shut down"))?;
        sender
            .send(Job { call, queue })
            .map_err(|_| Status::unavailable("admin service is shut down"))
    }
}

impl ServiceState {
    fn execute(&self, job: Job) {
        let Job { call, queue } = job;
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        self.calls.fetch_add(1, Ordering::Relaxed);

        let reply = if call.is_expired() {
            Err(Status::deadline_exceeded(format!("{} missed its deadline", call.method)))
        } else {
            let fault = self.faults.lock().pop_front();
            match fault {
                Some(status) => Err(status),
                None => match AdminRequest::decode(&call.payload) {
                    Ok(request) => self.apply(request),
                    Err(e) => Err(Status::invalid_argument(format!("malformed request: {}", e))),
                },
            }
        };

        let (payload, status) = match reply {
            Ok(payload) => (payload, Status::ok()),
            Err(status) => (Vec::new(), status),
        };
        debug!(tag = %call.tag, method = %call.method, status = %status, "Admin call executed");

        if let Err(e) = queue.notify(call.tag, payload, status) {
            debug!(tag = %call.tag, error = %e, "Late completion dropped");
        }
    }

    fn apply(&self, request: AdminRequest) -> Reply {
        match request {
            AdminRequest::CreateTable {
                parent,
                table_id,
                config,
            } => {
                let name = format!("{}/tables/{}", parent, table_id);
                let table = Table {
                    name: name.clone(),
                    column_families: config
                        .column_families
                        .into_iter()
                        .map(|(id, rule)| (id, ColumnFamily::with_rule(rule)))
                        .collect(),
                };
                match self.tables.entry(name) {
                    dashmap::mapref::entry::Entry::Occupied(entry) => {
                        Err(Status::already_exists(format!("table {} already exists", entry.key())))
                    }
                    dashmap::mapref::entry::Entry::Vacant(entry) => {
                        entry.insert(table.clone());
                        encode(&table)
                    }
                }
            }
            AdminRequest::GetTable { name, view } => match self.tables.get(&name) {
                Some(table) => encode(&table.project(view)),
                None => Err(Status::not_found(format!("table {} not found", name))),
            },
            AdminRequest::ListTables { parent, view } => {
                let prefix = format!("{}/tables/", parent);
                let mut tables: Vec<Table> = self
                    .tables
                    .iter()
                    .filter(|entry| entry.key().starts_with(&prefix))
                    .map(|entry| entry.value().project(view))
                    .collect();
                tables.sort_by(|a, b| a.name.cmp(&b.name));
                encode(&tables)
            }
            AdminRequest::ModifyColumnFamilies {
                name,
                modifications,
            } => {
                let mut entry = self
                    .tables
                    .get_mut(&name)
                    .ok_or_else(|| Status::not_found(format!("table {} not found", name)))?;
                let mut updated = entry.value().clone();
                for modification in modifications {
                    apply_modification(&mut updated, modification)?;
                }
                *entry.value_mut() = updated.clone();
                encode(&updated.project(TableView::Full))
            }
            AdminRequest::DeleteTable { name } => match self.tables.remove(&name) {
                Some(_) => encode(&()),
                None => Err(Status::not_found(format!("table {} not found", name))),
            },
        }
    }
}

fn apply_modification(table: &mut Table, modification: ColumnFamilyModification) -> Result<(), Status> {
    match modification {
        ColumnFamilyModification::Create { id, rule } => {
            if table.column_families.contains_key(&id) {
                return Err(Status::already_exists(format!("column family {} already exists", id)));
            }
            table.column_families.insert(id, ColumnFamily::with_rule(rule));
        }
        ColumnFamilyModification::Update { id, rule } => match table.column_families.get_mut(&id) {
            Some(family) => family.gc_rule = Some(rule),
            None => return Err(Status::not_found(format!("column family {} not found", id))),
        },
        ColumnFamilyModification::Drop { id } => {
            if table.column_families.remove(&id).is_none() {
                return Err(Status::not_found(format!("column family {} not found", id)));
            }
        }
    }
    Ok(())
}

fn encode<T: Serialize>(value: &T) -> Reply {
    codec::to_vec(value).map_err(|e| Status::unknown(e.to_string()))
}
