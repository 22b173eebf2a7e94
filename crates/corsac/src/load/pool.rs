//! Fixed worker pool used as a bulk-synchronous barrier.
//!
//! A [`TaskPool`] owns a fixed set of OS worker threads draining one
//! shared FIFO job queue guarded by a mutex and a condition variable.
//! [`TaskPool::submit`] appends a job and wakes one waiting worker.
//! Dropping the pool sets the stop flag, wakes every worker, and joins
//! them; each worker drains any remaining jobs before exiting, so no
//! submitted job is silently dropped and the drop doubles as the barrier.
//!
//! Pool lifetime is scoped to exactly one batch of work: construct,
//! submit N jobs, drop. Callers never manage individual job handles;
//! phases that need results send them over a channel and collect after
//! the drop has joined the workers.

use crate::error::{CsvError, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use tracing::warn;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct PoolShared {
    queue: Mutex<VecDeque<Job>>,
    job_ready: Condvar,
    stop: AtomicBool,
}

/// Fixed-size worker pool over a shared FIFO job queue.
pub struct TaskPool {
    shared: Arc<PoolShared>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl TaskPool {
    /// Spawns a pool with `threads` workers.
    ///
    /// # Errors
    ///
    /// Returns [`CsvError::InvalidConfiguration`] when `threads` is zero.
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(CsvError::InvalidConfiguration(
                "worker pool requires at least one thread".to_string(),
            ));
        }

        let shared = Arc::new(PoolShared {
            queue: Mutex::new(VecDeque::new()),
            job_ready: Condvar::new(),
            stop: AtomicBool::new(false),
        });

        let workers = (0..threads)
            .map(|_| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || worker_loop(&shared))
            })
            .collect();

        Ok(Self { shared, workers })
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Appends a job to the queue and wakes one waiting worker.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        lock(&self.shared.queue).push_back(Box::new(job));
        self.shared.job_ready.notify_one();
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        self.shared.job_ready.notify_all();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("worker thread exited with a panic during pool teardown");
            }
        }
    }
}

fn worker_loop(shared: &PoolShared) {
    loop {
        let job = {
            let mut queue = lock(&shared.queue);
            loop {
                if let Some(job) = queue.pop_front() {
                    break job;
                }
                // Exit only once the stop flag is set *and* the queue is
                // empty: remaining jobs are drained first.
                if shared.stop.load(Ordering::SeqCst) {
                    return;
                }
                queue = shared
                    .job_ready
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };
        job();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
