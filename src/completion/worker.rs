/*!
 * Worker Pool
 * OS threads that each run the completion loop of one shared queue
 */

use super::queue::CompletionQueue;
use crate::config::CompletionConfig;
use crate::core::errors::{CompletionError, CompletionResult};
use std::thread::{self, JoinHandle};
use tracing::{error, info, info_span, warn};

/// Fixed-size pool of threads executing `CompletionQueue::run`
///
/// Threads are not bound to particular operations; any worker may deliver
/// any completion. The owner is expected to call [`WorkerPool::shutdown`] or
/// [`WorkerPool::join`]; dropping an unjoined pool detaches its threads.
pub struct WorkerPool {
    queue: CompletionQueue,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `config.worker_threads` workers against `queue`
    pub fn spawn(queue: &CompletionQueue, config: &CompletionConfig) -> CompletionResult<Self> {
        config
            .validate()
            .map_err(|e| CompletionError::WorkerSpawn(e.to_string()))?;

        let mut pool = Self {
            queue: queue.clone(),
            handles: Vec::with_capacity(config.worker_threads),
        };

        for index in 0..config.worker_threads {
            let cq = queue.clone();
            let queue_id = queue.id();
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name, index))
                .spawn(move || {
                    let span = info_span!("cq_worker", queue = queue_id, worker = index);
                    let _guard = span.enter();
                    cq.run();
                });

            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(e) => {
                    error!(worker = index, error = %e, "Failed to spawn completion worker");
                    // Workers already started would otherwise block forever
                    pool.queue.shutdown_now();
                    pool.join();
                    return Err(CompletionError::WorkerSpawn(e.to_string()));
                }
            }
        }

        info!(
            queue = queue.id(),
            workers = pool.handles.len(),
            "Completion worker pool started"
        );
        Ok(pool)
    }

    /// Spawn a pool with a single worker
    pub fn single(queue: &CompletionQueue) -> CompletionResult<Self> {
        Self::spawn(queue, &CompletionConfig::default())
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Queue served by this pool
    pub fn queue(&self) -> &CompletionQueue {
        &self.queue
    }

    /// Shut the queue down and wait for every worker to return
    pub fn shutdown(self) -> usize {
        self.queue.shutdown();
        self.join()
    }

    /// Wait for every worker to return
    ///
    /// Only returns after the queue has been shut down and drained. Returns
    /// the number of workers that exited by panicking.
    pub fn join(mut self) -> usize {
        let mut panicked = 0;
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                panicked += 1;
            }
        }
        if panicked > 0 {
            warn!(queue = self.queue.id(), panicked = panicked, "Completion workers panicked");
        } else {
            info!(queue = self.queue.id(), "Completion worker pool joined");
        }
        panicked
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            warn!(
                queue = self.queue.id(),
                workers = self.handles.len(),
                "Worker pool dropped without join; threads detached"
            );
        }
    }
}
