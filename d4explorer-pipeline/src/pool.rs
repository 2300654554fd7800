//! A worker pool with a bounded submission queue.
//!
//! [MaxQueuePool::submit] takes one of `max_queue_size` slots before handing
//! the task to the worker threads and blocks while none is free. The slot is
//! given back when the task has finished, whether it returned, panicked or
//! was cancelled.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Select, Sender, bounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::errors::{PipelineError, Result};

///
/// Shared flag that stops tasks which have not started yet.
///
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Frees one queue slot when dropped.
struct SlotGuard {
    slots: Receiver<()>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let _ = self.slots.try_recv();
    }
}

///
/// Result of a submitted task. Tasks are numbered in submission order,
/// starting at 0.
///
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: usize,
    receiver: Receiver<Result<T>>,
}

impl<T> TaskHandle<T> {
    pub fn id(&self) -> usize {
        self.id
    }

    ///
    /// Block until the task is done.
    ///
    pub fn result(self) -> Result<T> {
        self.receiver.recv().unwrap_or(Err(PipelineError::TaskLost))
    }
}

pub struct MaxQueuePool {
    pool: ThreadPool,
    slots_tx: Sender<()>,
    slots_rx: Receiver<()>,
    max_queue_size: usize,
    submitted: AtomicUsize,
    cancel: CancelToken,
}

impl MaxQueuePool {
    ///
    /// # Arguments
    ///
    /// - workers: number of worker threads
    /// - max_queue_size: number of tasks that may be submitted and not yet
    ///   finished at any time
    ///
    pub fn new(workers: usize, max_queue_size: usize) -> Result<MaxQueuePool> {
        if workers == 0 || max_queue_size == 0 {
            return Err(PipelineError::Config(format!(
                "workers ({}) and max_queue_size ({}) must be positive",
                workers, max_queue_size
            )));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("d4explorer-worker-{}", i))
            .build()?;
        let (slots_tx, slots_rx) = bounded(max_queue_size);

        Ok(MaxQueuePool {
            pool,
            slots_tx,
            slots_rx,
            max_queue_size,
            submitted: AtomicUsize::new(0),
            cancel: CancelToken::default(),
        })
    }

    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Tasks submitted and not finished.
    pub fn in_flight(&self) -> usize {
        self.slots_rx.len()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    ///
    /// Queue a task, blocking while `max_queue_size` tasks are in flight.
    ///
    /// A task that has not started when the pool's [CancelToken] fires
    /// finishes with [PipelineError::Cancelled] without running.
    ///
    pub fn submit<F, T>(&self, task: F) -> Result<TaskHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.slots_tx
            .send(())
            .map_err(|_| PipelineError::Config("worker pool is closed".to_string()))?;
        let guard = SlotGuard {
            slots: self.slots_rx.clone(),
        };

        let id = self.submitted.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = bounded(1);
        let cancel = self.cancel.clone();
        debug!(task = id, in_flight = self.in_flight(), "submitting task");

        self.pool.spawn(move || {
            let outcome = if cancel.is_cancelled() {
                Err(PipelineError::Cancelled)
            } else {
                panic::catch_unwind(AssertUnwindSafe(task))
                    .map_err(|payload| PipelineError::TaskPanicked(panic_message(payload)))
            };
            let _ = tx.send(outcome);
            drop(guard);
        });

        Ok(TaskHandle { id, receiver: rx })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

///
/// Iterate over task results as they complete, yielding `(task id, result)`.
///
pub fn as_completed<T>(handles: Vec<TaskHandle<T>>) -> AsCompleted<T> {
    AsCompleted { pending: handles }
}

pub struct AsCompleted<T> {
    pending: Vec<TaskHandle<T>>,
}

impl<T> Iterator for AsCompleted<T> {
    type Item = (usize, Result<T>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pending.is_empty() {
            return None;
        }
        let (index, outcome) = {
            let mut select = Select::new();
            for handle in &self.pending {
                select.recv(&handle.receiver);
            }
            let operation = select.select();
            let index = operation.index();
            (index, operation.recv(&self.pending[index].receiver))
        };
        let handle = self.pending.swap_remove(index);
        let result = outcome.unwrap_or(Err(PipelineError::TaskLost));
        Some((handle.id, result))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.pending.len(), Some(self.pending.len()))
    }
}
