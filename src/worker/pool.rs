//! Worker pool: bounded concurrent execution of background handlers.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::worker::task::Task;

/// Fixed number of execution slots for background work.
///
/// `submit` never blocks or rejects: jobs beyond capacity wait for a slot on
/// their own tokio task. Once [`WorkerPool::drain`] starts, jobs that have
/// not yet obtained a slot are skipped and their tasks handed back.
pub struct WorkerPool {
    slots: Arc<Semaphore>,
    capacity: usize,
    draining: Arc<AtomicBool>,
    handles: Mutex<Vec<JoinHandle<Option<Task>>>>,
}

impl WorkerPool {
    /// Create a pool with `max_workers` slots (at least one).
    pub fn new(max_workers: usize) -> Self {
        let capacity = max_workers.max(1);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            draining: Arc::new(AtomicBool::new(false)),
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently running a job.
    pub fn busy(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }

    /// Fire-and-forget: run `job` for `task` once a slot is free.
    pub fn submit<F>(&self, task: Task, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let slots = Arc::clone(&self.slots);
        let draining = Arc::clone(&self.draining);

        let handle = tokio::spawn(async move {
            let Ok(_permit) = slots.acquire_owned().await else {
                return Some(task);
            };
            if draining.load(Ordering::Acquire) {
                tracing::debug!(task = %task.name, "Pool draining, task not started");
                return Some(task);
            }
            job.await;
            None
        });

        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Stop starting new jobs, wait for running ones, and return the tasks
    /// that never got a slot.
    pub async fn drain(&self) -> Vec<Task> {
        self.draining.store(true, Ordering::Release);
        let handles: Vec<_> = {
            let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
            handles.drain(..).collect()
        };

        let mut unstarted = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Some(task)) => unstarted.push(task),
                Ok(None) => {}
                Err(e) => tracing::error!("Worker task aborted: {}", e),
            }
        }
        unstarted
    }
}
