/*!
 * In-memory Admin Service Tests
 * End-to-end admin flows through the completion queue
 */

use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use table_admin_cq::admin::{
    ColumnFamily, ColumnFamilyModification, GcRule, InMemoryAdminService, ServiceConfig,
    TableAdmin, TableConfig, TableView,
};
use table_admin_cq::completion::{CompletionQueue, WorkerPool};
use table_admin_cq::config::CompletionConfig;
use table_admin_cq::core::{random_table_id, Status, StatusCode};

struct Harness {
    cq: CompletionQueue,
    pool: WorkerPool,
    service: Arc<InMemoryAdminService>,
    admin: TableAdmin,
}

impl Harness {
    fn new(service_config: ServiceConfig) -> Self {
        let cq = CompletionQueue::new();
        let pool = WorkerPool::spawn(&cq, &CompletionConfig::with_workers(2)).unwrap();
        let service = Arc::new(InMemoryAdminService::new(service_config));
        let admin = TableAdmin::new(service.clone(), "test-project", "test-instance").unwrap();
        Self {
            cq,
            pool,
            service,
            admin,
        }
    }

    fn finish(self) {
        assert_eq!(self.service.shutdown(), 0);
        assert_eq!(self.pool.shutdown(), 0);
    }
}

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[test]
fn test_table_lifecycle() {
    let h = Harness::new(ServiceConfig::default());
    let table_id = random_table_id("it");

    let config = TableConfig::new(
        [
            ("fam", GcRule::max_num_versions(5)),
            ("foo", GcRule::max_age(DAY)),
        ],
        ["a1000", "a2000", "b3000", "m5000"],
    );
    let created = h.admin.create_table(&h.cq, &table_id, config).unwrap();
    assert_eq!(created.name, h.admin.table_name(&table_id));
    assert_eq!(created.table_id(), table_id);

    let fetched = h
        .admin
        .get_table(&h.cq, &table_id, TableView::Full)
        .unwrap();
    assert_eq!(fetched, created);

    let modified = h
        .admin
        .modify_column_families(
            &h.cq,
            &table_id,
            vec![
                ColumnFamilyModification::create(
                    "newfam",
                    GcRule::intersection([GcRule::max_age(7 * DAY), GcRule::max_num_versions(1)]),
                ),
                ColumnFamilyModification::update("fam", GcRule::max_num_versions(2)),
                ColumnFamilyModification::drop("foo"),
            ],
        )
        .unwrap();

    let expected: BTreeMap<String, ColumnFamily> = [
        ("fam".to_string(), ColumnFamily::with_rule(GcRule::max_num_versions(2))),
        (
            "newfam".to_string(),
            ColumnFamily::with_rule(GcRule::intersection([
                GcRule::max_age(7 * DAY),
                GcRule::max_num_versions(1),
            ])),
        ),
    ]
    .into_iter()
    .collect();
    assert_eq!(modified.column_families, expected);

    let listed = h.admin.list_tables(&h.cq, TableView::NameOnly).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].table_id(), table_id);
    assert!(listed[0].column_families.is_empty());

    h.admin.delete_table(&h.cq, &table_id).unwrap();
    assert!(h.admin.list_tables(&h.cq, TableView::NameOnly).unwrap().is_empty());
    assert_eq!(
        h.admin
            .get_table(&h.cq, &table_id, TableView::Full)
            .unwrap_err()
            .code(),
        StatusCode::NotFound
    );

    h.finish();
}

#[test]
fn test_injected_fault_passes_through() {
    let h = Harness::new(ServiceConfig::default());
    h.service.inject_fault(Status::unavailable("backend restarting"));

    let err = h.admin.list_tables(&h.cq, TableView::Full).unwrap_err();
    assert_eq!(err, Status::unavailable("backend restarting"));
    assert!(h.admin.list_tables(&h.cq, TableView::Full).is_ok());

    h.finish();
}

#[test]
fn test_slow_service_exceeds_deadline() {
    let h = Harness::new(ServiceConfig {
        threads: 1,
        latency: Duration::from_millis(50),
    });
    let admin = h.admin.clone().with_call_timeout(Some(Duration::from_millis(5)));

    let err = admin.get_table(&h.cq, "anything", TableView::Full).unwrap_err();
    assert_eq!(err.code(), StatusCode::DeadlineExceeded);
    assert_eq!(h.service.calls(), 1);

    h.finish();
}

#[test]
fn test_stopped_service_is_unavailable() {
    let h = Harness::new(ServiceConfig::default());
    assert_eq!(h.service.shutdown(), 0);

    let err = h
        .admin
        .create_table(&h.cq, "t1", TableConfig::default())
        .unwrap_err();
    assert_eq!(err.code(), StatusCode::Unavailable);
    assert_eq!(h.cq.stats().notified, 1);

    h.finish();
}

#[test]
fn test_invalid_arguments_never_reach_service() {
    let h = Harness::new(ServiceConfig::default());

    let err = h
        .admin
        .create_table(&h.cq, "bad/id", TableConfig::default())
        .unwrap_err();
    assert_eq!(err.code(), StatusCode::InvalidArgument);

    let err = h
        .admin
        .modify_column_families(&h.cq, "t1", Vec::new())
        .unwrap_err();
    assert_eq!(err.code(), StatusCode::InvalidArgument);

    assert_eq!(h.service.calls(), 0);
    assert_eq!(h.cq.stats().registered, 0);
    h.finish();
}

#[test]
fn test_concurrent_creates_from_many_callers() {
    let h = Harness::new(ServiceConfig {
        threads: 4,
        latency: Duration::ZERO,
    });

    let callers: Vec<_> = (0..8)
        .map(|i| {
            let admin = h.admin.clone();
            let cq = h.cq.clone();
            std::thread::spawn(move || {
                for j in 0..10 {
                    admin
                        .create_table(&cq, &format!("t{}-{}", i, j), TableConfig::default())
                        .unwrap();
                }
            })
        })
        .collect();
    for caller in callers {
        caller.join().unwrap();
    }

    assert_eq!(h.service.table_count(), 80);
    assert_eq!(
        h.admin.list_tables(&h.cq, TableView::NameOnly).unwrap().len(),
        80
    );
    h.finish();
}
