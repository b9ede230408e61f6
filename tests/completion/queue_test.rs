/*!
 * Completion Queue Tests
 * Delivery guarantees, shutdown draining and tag validation
 */

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use table_admin_cq::completion::{CompletionQueue, QueueState};
use table_admin_cq::core::{CompletionError, Status, StatusCode, Tag};

fn spawn_runners(cq: &CompletionQueue, count: usize) -> Vec<thread::JoinHandle<()>> {
    (0..count)
        .map(|_| {
            let cq = cq.clone();
            thread::spawn(move || cq.run())
        })
        .collect()
}

fn join_all(handles: Vec<thread::JoinHandle<()>>) {
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_every_operation_delivered_exactly_once() {
    for workers in [1, 2, 4, 8] {
        let cq = CompletionQueue::new();
        let runners = spawn_runners(&cq, workers);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let tags: Vec<Tag> = (0..500)
            .map(|i: u32| {
                let seen = seen.clone();
                cq.register(move |_, payload, status| {
                    assert!(status.is_ok());
                    assert_eq!(payload, i.to_le_bytes().to_vec());
                    seen.lock().push(i);
                })
                .unwrap()
            })
            .collect();

        let distinct: HashSet<Tag> = tags.iter().copied().collect();
        assert_eq!(distinct.len(), tags.len());

        for (i, tag) in tags.iter().enumerate() {
            cq.notify(*tag, (i as u32).to_le_bytes().to_vec(), Status::ok())
                .unwrap();
        }

        cq.shutdown();
        join_all(runners);

        let mut seen = seen.lock().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..500).collect::<Vec<u32>>());
        assert_eq!(cq.state(), QueueState::Drained);
        assert_eq!(cq.stats().delivered, 500);
    }
}

#[test]
fn test_notifications_from_many_threads() {
    let cq = CompletionQueue::new();
    let runners = spawn_runners(&cq, 3);
    let delivered = Arc::new(AtomicUsize::new(0));

    let tags: Vec<Tag> = (0..400)
        .map(|_| {
            let delivered = delivered.clone();
            cq.register(move |_, _, _| {
                delivered.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap()
        })
        .collect();

    let notifiers: Vec<_> = tags
        .chunks(100)
        .map(|chunk| {
            let cq = cq.clone();
            let chunk = chunk.to_vec();
            thread::spawn(move || {
                for tag in chunk {
                    cq.notify(tag, Vec::new(), Status::ok()).unwrap();
                }
            })
        })
        .collect();
    join_all(notifiers);

    cq.shutdown();
    join_all(runners);
    assert_eq!(delivered.load(Ordering::SeqCst), 400);
}

#[test]
fn test_shutdown_then_late_notifications_all_fire() {
    let cq = CompletionQueue::new();
    let runners = spawn_runners(&cq, 4);
    let statuses = Arc::new(Mutex::new(Vec::new()));

    let tags: Vec<Tag> = (0..100)
        .map(|_| {
            let statuses = statuses.clone();
            cq.register(move |_, _, status| statuses.lock().push(status.code()))
                .unwrap()
        })
        .collect();

    cq.shutdown();
    assert_eq!(cq.state(), QueueState::ShuttingDown);
    assert_eq!(
        cq.register(|_, _, _| {}).unwrap_err(),
        CompletionError::QueueClosed
    );

    for tag in &tags {
        cq.notify(*tag, Vec::new(), Status::ok()).unwrap();
    }
    join_all(runners);

    let statuses = statuses.lock();
    assert_eq!(statuses.len(), 100);
    assert!(statuses.iter().all(|code| *code == StatusCode::Ok));
}

#[test]
fn test_grace_expiry_cancels_outstanding() {
    let cq = CompletionQueue::with_grace(Duration::from_millis(50));
    let results = Arc::new(Mutex::new(Vec::new()));

    let tags: Vec<Tag> = (0..3)
        .map(|_| {
            let results = results.clone();
            cq.register(move |_, _, status| results.lock().push(status.code()))
                .unwrap()
        })
        .collect();
    cq.notify(tags[0], b"done".to_vec(), Status::ok()).unwrap();

    cq.shutdown();
    let started = Instant::now();
    cq.run();
    assert!(started.elapsed() >= Duration::from_millis(40));

    let mut results = results.lock().clone();
    results.sort_by_key(|code| code.as_str());
    assert_eq!(
        results,
        vec![StatusCode::Cancelled, StatusCode::Cancelled, StatusCode::Ok]
    );

    assert_eq!(
        cq.notify(tags[1], Vec::new(), Status::ok()).unwrap_err(),
        CompletionError::AlreadyCompleted(tags[1])
    );
    assert_eq!(cq.stats().cancelled, 2);
}

#[test]
fn test_run_returns_promptly_after_shutdown_now() {
    let cq = CompletionQueue::new();
    for _ in 0..10 {
        cq.register(|_, _, status| assert!(status.is_cancelled()))
            .unwrap();
    }
    let runners = spawn_runners(&cq, 4);

    let started = Instant::now();
    cq.shutdown_now();
    join_all(runners);

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(cq.pending(), 0);
    assert_eq!(cq.stats().delivered, 10);
}

#[test]
fn test_idle_runners_exit_on_shutdown() {
    let cq = CompletionQueue::new();
    let runners = spawn_runners(&cq, 3);
    thread::sleep(Duration::from_millis(20));

    cq.shutdown();
    join_all(runners);
    assert_eq!(cq.state(), QueueState::Drained);
}

#[test]
fn test_shuffled_notification_order() {
    let cq = CompletionQueue::new();
    let delivered = Arc::new(Mutex::new(HashSet::new()));

    let mut tags: Vec<Tag> = (0..200)
        .map(|_| {
            let delivered = delivered.clone();
            cq.register(move |_, payload, _| {
                assert!(delivered.lock().insert(payload));
            })
            .unwrap()
        })
        .collect();

    tags.shuffle(&mut StdRng::seed_from_u64(7));
    let runners = spawn_runners(&cq, 2);
    for tag in &tags {
        cq.notify(*tag, tag.sequence().to_le_bytes().to_vec(), Status::ok())
            .unwrap();
    }

    cq.shutdown();
    join_all(runners);
    assert_eq!(delivered.lock().len(), 200);
}

#[test]
fn test_tags_are_bound_to_their_queue() {
    let first = CompletionQueue::new();
    let second = CompletionQueue::new();
    assert_ne!(first.id(), second.id());

    let tag = first.register(|_, _, _| {}).unwrap();
    assert_eq!(
        second.notify(tag, Vec::new(), Status::ok()).unwrap_err(),
        CompletionError::UnknownTag(tag)
    );

    first.notify(tag, Vec::new(), Status::ok()).unwrap();
    assert_eq!(
        first.notify(tag, Vec::new(), Status::ok()).unwrap_err(),
        CompletionError::AlreadyCompleted(tag)
    );

    first.shutdown();
    first.run();
    second.shutdown();
    second.run();
    assert_eq!(first.stats().rejected, 1);
    assert_eq!(second.stats().rejected, 1);
}

#[test]
fn test_error_status_passes_through() {
    let cq = CompletionQueue::new();
    let seen = Arc::new(Mutex::new(None));
    let seen_cb = seen.clone();

    let tag = cq
        .register(move |_, _, status| *seen_cb.lock() = Some(status))
        .unwrap();
    cq.notify(tag, Vec::new(), Status::unavailable("connection reset"))
        .unwrap();
    cq.shutdown();
    cq.run();

    assert_eq!(
        seen.lock().take(),
        Some(Status::unavailable("connection reset"))
    );
}
