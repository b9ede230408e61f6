/*!
 * Table Admin Client Tests
 * Async calls driven by a hand-operated launcher
 */

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use table_admin_cq::admin::{
    AdminMethod, AdminRequest, CallLauncher, RemoteCall, Table, TableAdmin, TableView,
};
use table_admin_cq::completion::{CompletionQueue, WorkerPool};
use table_admin_cq::core::bincode as codec;
use table_admin_cq::core::{AdminError, CompletionError, Status, StatusCode};

/// Records calls and leaves completing them to the test
#[derive(Default)]
struct ManualLauncher {
    calls: Mutex<Vec<(RemoteCall, CompletionQueue)>>,
}

impl ManualLauncher {
    fn take(&self) -> Vec<(RemoteCall, CompletionQueue)> {
        std::mem::take(&mut *self.calls.lock())
    }
}

impl CallLauncher for ManualLauncher {
    fn start_call(&self, call: RemoteCall, queue: CompletionQueue) -> Result<(), Status> {
        self.calls.lock().push((call, queue));
        Ok(())
    }
}

fn setup() -> (Arc<ManualLauncher>, TableAdmin) {
    let launcher = Arc::new(ManualLauncher::default());
    let admin = TableAdmin::new(launcher.clone(), "the-project", "the-instance").unwrap();
    (launcher, admin)
}

#[test]
fn test_get_table_completion_delivered_once() {
    let (launcher, admin) = setup();
    let cq = CompletionQueue::new();
    let pool = WorkerPool::single(&cq).unwrap();

    let (tx, rx) = flume::unbounded();
    let tag = admin
        .async_get_table("t1", TableView::Full, &cq, move |_, table, status| {
            let _ = tx.send((thread::current().name().map(str::to_string), table, status));
        })
        .unwrap();

    let mut calls = launcher.take();
    assert_eq!(calls.len(), 1);
    let (call, queue) = calls.remove(0);
    assert_eq!(call.tag, tag);
    assert_eq!(call.method, AdminMethod::GetTable);
    assert_eq!(
        AdminRequest::decode(&call.payload).unwrap(),
        AdminRequest::GetTable {
            name: "projects/the-project/instances/the-instance/tables/t1".to_string(),
            view: TableView::Full,
        }
    );

    let reply = Table {
        name: admin.table_name("t1"),
        ..Default::default()
    };
    queue
        .notify(call.tag, codec::to_vec(&reply).unwrap(), Status::ok())
        .unwrap();

    let (worker, table, status) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(worker.as_deref(), Some("cq-worker-0"));
    assert_eq!(table, reply);
    assert!(status.is_ok());

    assert_eq!(
        queue.notify(call.tag, Vec::new(), Status::ok()).unwrap_err(),
        CompletionError::AlreadyCompleted(tag)
    );
    assert!(rx.try_recv().is_err());
    pool.shutdown();
}

#[test]
fn test_hundred_calls_complete_after_shutdown() {
    let (launcher, admin) = setup();
    let cq = CompletionQueue::new();
    let pool = WorkerPool::spawn(
        &cq,
        &table_admin_cq::config::CompletionConfig::with_workers(4),
    )
    .unwrap();
    let outcomes = Arc::new(Mutex::new(Vec::new()));

    for i in 0..100 {
        let outcomes = outcomes.clone();
        admin
            .async_delete_table(&format!("table-{}", i), &cq, move |_, (), status| {
                outcomes.lock().push(status.code());
            })
            .unwrap();
    }
    cq.shutdown();

    for (call, queue) in launcher.take() {
        queue.notify(call.tag, codec::to_vec(&()).unwrap(), Status::ok()).unwrap();
    }
    assert_eq!(pool.join(), 0);

    let outcomes = outcomes.lock();
    assert_eq!(outcomes.len(), 100);
    assert!(outcomes.iter().all(|code| *code == StatusCode::Ok));
}

#[test]
fn test_issue_after_shutdown_registers_nothing() {
    let (launcher, admin) = setup();
    let cq = CompletionQueue::new();
    cq.shutdown();

    let result = admin.async_list_tables(TableView::NameOnly, &cq, |_, _, _| {
        panic!("no callback for a closed queue")
    });
    assert_eq!(result.unwrap_err(), AdminError::QueueClosed);
    assert!(launcher.take().is_empty());
    assert_eq!(cq.stats().registered, 0);
}

#[test]
fn test_error_status_reaches_callback_unchanged() {
    let (launcher, admin) = setup();
    let cq = CompletionQueue::new();
    let seen = Arc::new(Mutex::new(None));
    let seen_cb = seen.clone();

    admin
        .async_create_table("t1", Default::default(), &cq, move |_, table, status| {
            *seen_cb.lock() = Some((table, status));
        })
        .unwrap();
    for (call, queue) in launcher.take() {
        queue
            .notify(call.tag, Vec::new(), Status::already_exists("table t1 exists"))
            .unwrap();
    }
    cq.shutdown();
    cq.run();

    assert_eq!(
        seen.lock().take(),
        Some((Table::default(), Status::already_exists("table t1 exists")))
    );
}

#[test]
fn test_unanswered_call_cancelled_at_shutdown() {
    let (launcher, admin) = setup();
    let cq = CompletionQueue::with_grace(Duration::from_millis(10));
    let runner = {
        let cq = cq.clone();
        thread::spawn(move || cq.run())
    };

    let blocking = {
        let admin = admin.clone();
        let cq = cq.clone();
        thread::spawn(move || admin.get_table(&cq, "slow", TableView::Full))
    };
    while launcher.calls.lock().is_empty() {
        thread::sleep(Duration::from_millis(1));
    }
    cq.shutdown();

    let result = blocking.join().unwrap();
    assert_eq!(result.unwrap_err().code(), StatusCode::Cancelled);
    runner.join().unwrap();

    let (call, queue) = launcher.take().remove(0);
    assert!(queue.notify(call.tag, Vec::new(), Status::ok()).is_err());
}
