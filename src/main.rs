/*!
 * Table Admin Demo
 *
 * Runs create, get, modify, delete and list against the in-memory admin
 * service through a completion queue and its worker pool.
 *
 * Environment variables:
 * - ADMIN_PROJECT: project id (default: demo-project)
 * - ADMIN_INSTANCE: instance id (default: demo-instance)
 * - CQ_WORKER_THREADS, CQ_SHUTDOWN_GRACE_MS, CQ_THREAD_NAME: see CompletionConfig
 */

use anyhow::{ensure, Context};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use table_admin_cq::{
    init_tracing, make_adapter, random_table_id, ColumnFamilyModification, CompletionConfig,
    CompletionQueue, GcRule, InMemoryAdminService, ServiceConfig, TableAdmin, TableConfig,
    TableView, WorkerPool,
};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = CompletionConfig::from_env().context("invalid completion queue configuration")?;
    let project = std::env::var("ADMIN_PROJECT").unwrap_or_else(|_| "demo-project".to_string());
    let instance = std::env::var("ADMIN_INSTANCE").unwrap_or_else(|_| "demo-instance".to_string());
    info!(
        project = %project,
        instance = %instance,
        workers = config.worker_threads,
        "Table admin demo starting"
    );

    let cq = CompletionQueue::from_config(&config);
    let pool = WorkerPool::spawn(&cq, &config).context("failed to start completion workers")?;
    let service = Arc::new(InMemoryAdminService::new(ServiceConfig::default()));
    let admin = TableAdmin::new(service.clone(), project, instance)?;

    let table_id = random_table_id("demo");
    let table_config = TableConfig::new(
        [
            ("fam", GcRule::max_num_versions(5)),
            ("foo", GcRule::max_age(Duration::from_secs(24 * 60 * 60))),
        ],
        ["a1000", "a2000", "b3000", "m5000"],
    );

    let created = admin.create_table(&cq, &table_id, table_config)?;
    info!(table = %created.name, families = created.column_families.len(), "Created table");

    // Async call resolved by hand through an adapter
    let (setter, waiter) = make_adapter();
    admin.async_get_table(&table_id, TableView::Full, &cq, move |_, table, status| {
        if status.is_ok() {
            setter.set_value(table);
        } else {
            setter.set_error(status);
        }
    })?;
    let fetched = waiter.get()?;
    ensure!(
        fetched.name == admin.table_name(&table_id),
        "fetched table {} does not match {}",
        fetched.name,
        table_id
    );
    info!(table = %fetched.name, "Fetched table");

    let modified = admin.modify_column_families(
        &cq,
        &table_id,
        vec![
            ColumnFamilyModification::create(
                "newfam",
                GcRule::intersection([
                    GcRule::max_age(Duration::from_secs(7 * 24 * 60 * 60)),
                    GcRule::max_num_versions(1),
                ]),
            ),
            ColumnFamilyModification::update("fam", GcRule::max_num_versions(2)),
            ColumnFamilyModification::drop("foo"),
        ],
    )?;
    let families: Vec<&str> = modified.column_families.keys().map(String::as_str).collect();
    info!(table = %modified.name, families = ?families, "Modified column families");

    admin.delete_table(&cq, &table_id)?;
    let remaining = admin.list_tables(&cq, TableView::NameOnly)?;
    ensure!(
        remaining.iter().all(|t| t.table_id() != table_id),
        "table {} still listed after delete",
        table_id
    );
    info!(table_id = %table_id, remaining = remaining.len(), "Deleted table");

    let service_panics = service.shutdown();
    ensure!(service_panics == 0, "{} admin service threads panicked", service_panics);
    let stats = cq.stats();
    let panicked = pool.shutdown();
    ensure!(panicked == 0, "{} completion workers panicked", panicked);

    info!(
        registered = stats.registered,
        delivered = stats.delivered,
        cancelled = stats.cancelled,
        "Table admin demo finished"
    );
    Ok(())
}
