//! Queueing task runner.
//!
//! Runs a batch of independent per-entity tasks on a fixed-size worker pool
//! and waits for all of them. Errors returned by tasks are collected; a
//! panicking task is converted into an error and does not disturb its
//! siblings. An optional deadline, shared by every batch the runner
//! executes, skips tasks that have not started yet.

use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::error::CacheUpdateError;

/// A unit of work in a batch.
pub trait CacheTask: Send + Sync {
    /// Name used in error reports, e.g. `procedure:P1`.
    fn name(&self) -> String;

    /// Run the task and return every error it encountered.
    fn run(&self) -> Vec<CacheUpdateError>;
}

/// Fixed-size worker pool for cache update tasks.
pub struct TaskRunner {
    threads: usize,
    deadline: Option<Instant>,
    pool: Option<rayon::ThreadPool>,
}

impl TaskRunner {
    /// Create a runner with `threads` workers (`0` means one per CPU).
    ///
    /// If the pool cannot be created, batches run on the calling thread.
    pub fn new(threads: usize) -> Self {
        let threads = effective_threads(threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("cache-update-{}", i))
            .build();

        let pool = match pool {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!(error = %e, threads, "Failed to build cache update pool, running tasks inline");
                None
            }
        };

        Self {
            threads,
            deadline: None,
            pool,
        }
    }

    /// Skip tasks that have not started once `budget` has passed since
    /// `started`, across all batches run by this runner.
    pub fn with_deadline(mut self, budget: Option<Duration>, started: Instant) -> Self {
        self.deadline = budget.and_then(|budget| started.checked_add(budget));
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run every task and wait for all of them to finish.
    pub fn run_all<'a>(&self, tasks: Vec<Box<dyn CacheTask + 'a>>) -> Vec<CacheUpdateError> {
        if tasks.is_empty() {
            return Vec::new();
        }

        let started = Instant::now();
        let count = tasks.len();
        let errors = Mutex::new(Vec::new());

        let execute = |task: &dyn CacheTask| {
            let found = run_guarded(task, self.deadline);
            if !found.is_empty() {
                errors.lock().extend(found);
            }
        };

        match &self.pool {
            // FIFO so tasks start in submission order.
            Some(pool) => pool.scope_fifo(|scope| {
                for task in &tasks {
                    let execute = &execute;
                    scope.spawn_fifo(move |_| execute(task.as_ref()));
                }
            }),
            None => tasks.iter().for_each(|task| execute(task.as_ref())),
        }

        let errors = errors.into_inner();
        debug!(
            tasks = count,
            errors = errors.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Task batch finished"
        );
        errors
    }
}

fn effective_threads(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    thread::available_parallelism().map_or(1, |n| n.get())
}

fn run_guarded(task: &dyn CacheTask, deadline: Option<Instant>) -> Vec<CacheUpdateError> {
    if deadline.is_some_and(|d| Instant::now() >= d) {
        return vec![CacheUpdateError::DeadlineExceeded { task: task.name() }];
    }

    match panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
        Ok(errors) => errors,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(task = %task.name(), message = %message, "Cache update task panicked");
            vec![CacheUpdateError::TaskPanicked {
                task: task.name(),
                message,
            }]
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
