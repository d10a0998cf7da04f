//! Bounded producer / worker pool / reducer coordinator.
//!
//! ```text
//! ┌──────────┐   tasks    ┌──────────┐   outputs   ┌─────────┐
//! │ producer │ ─────────► │ worker 1 │ ──────────► │         │
//! │ (thread) │ (bounded)  │ worker 2 │  (bounded)  │ reducer │
//! │          │            │ worker N │             │ (caller)│
//! └──────────┘            └──────────┘             └─────────┘
//!                              │ errors (bounded)   progress (lossy)
//!                              ▼
//! ```
//!
//! The reducer runs on the calling thread, so it can own non-`Send`
//! state. The first task error cancels the run: workers stop taking tasks,
//! the producer's next submit fails, the channels close in order and the
//! error is returned. A panicking task fails the run the same way.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, bounded};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::progress::ProgressInfo;

/// A unit of work that can describe itself in progress messages.
pub trait Task: Send {
    fn describe(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Worker threads (default: available cores minus one, at least one)
    pub num_workers: usize,
    /// Capacity of the task and output channels
    pub buffer_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let cores = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        Self {
            num_workers: cores.saturating_sub(1).max(1),
            buffer_size: 256,
        }
    }
}

#[derive(Default)]
struct Counters {
    total: AtomicUsize,
    known: AtomicBool,
    completed: AtomicUsize,
}

/// Handle given to the producer for submitting tasks.
pub struct TaskSink<'a, T> {
    tx: Sender<T>,
    cancel: &'a AtomicBool,
    counters: &'a Counters,
}

impl<T> TaskSink<'_, T> {
    /// Queue a task, blocking while the queue is full.
    /// Fails with [`Error::Cancelled`] once the run is aborted.
    pub fn submit(&self, task: T) -> Result<()> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }
        self.counters.total.fetch_add(1, Ordering::Relaxed);
        self.tx.send(task).map_err(|_| Error::Cancelled)
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    progress: Option<Sender<ProgressInfo>>,
    cancel: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            progress: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_progress(mut self, progress: Option<Sender<ProgressInfo>>) -> Self {
        self.progress = progress;
        self
    }

    /// Shared flag that aborts the run when set.
    #[cfg(test)]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run `produce` on its own thread, `work` on the pool and `reduce` on
    /// the calling thread. Output order is unspecified.
    pub fn run<T, O, P, W, R>(&self, produce: P, work: W, mut reduce: R) -> Result<()>
    where
        T: Task,
        O: Send,
        P: FnOnce(&TaskSink<'_, T>) -> Result<()> + Send,
        W: Fn(T) -> Result<O> + Sync,
        R: FnMut(O),
    {
        let num_workers = self.config.num_workers.max(1);
        let buffer = self.config.buffer_size.max(1);
        let (task_tx, task_rx) = bounded::<T>(buffer);
        let (out_tx, out_rx) = bounded::<O>(buffer);
        let (err_tx, err_rx) = bounded::<Error>(num_workers + 1);

        let counters = Counters::default();
        let started = Instant::now();
        let cancel: &AtomicBool = &self.cancel;
        let counters_ref = &counters;
        let work = &work;

        debug!(num_workers, buffer, "starting pipeline");

        thread::scope(|scope| {
            let producer_errors = err_tx.clone();
            scope.spawn(move || {
                let sink = TaskSink {
                    tx: task_tx,
                    cancel,
                    counters: counters_ref,
                };
                match produce(&sink) {
                    Ok(()) | Err(Error::Cancelled) => {}
                    Err(err) => {
                        warn!(error = %err, "task producer failed");
                        let _ = producer_errors.try_send(err);
                        cancel.store(true, Ordering::Relaxed);
                    }
                }
                counters_ref.known.store(true, Ordering::Relaxed);
                // dropping the sink closes the task channel
            });

            for _ in 0..num_workers {
                let worker = Worker {
                    tasks: task_rx.clone(),
                    outputs: out_tx.clone(),
                    errors: err_tx.clone(),
                    progress: self.progress.clone(),
                    cancel,
                    counters: counters_ref,
                    started,
                };
                scope.spawn(move || worker.run(work));
            }

            drop(task_rx);
            drop(out_tx);
            drop(err_tx);

            for output in out_rx.iter() {
                reduce(output);
            }
        });

        if let Ok(err) = err_rx.try_recv() {
            return Err(err);
        }
        if self.cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }
        debug!(
            tasks = counters.completed.load(Ordering::Relaxed),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline finished"
        );
        Ok(())
    }
}

struct Worker<'a, T, O> {
    tasks: Receiver<T>,
    outputs: Sender<O>,
    errors: Sender<Error>,
    progress: Option<Sender<ProgressInfo>>,
    cancel: &'a AtomicBool,
    counters: &'a Counters,
    started: Instant,
}

impl<T: Task, O> Worker<'_, T, O> {
    fn run(self, work: &impl Fn(T) -> Result<O>) {
        while !self.cancel.load(Ordering::Relaxed) {
            let Ok(task) = self.tasks.recv() else {
                break;
            };
            let label = task.describe();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(task)))
                .unwrap_or_else(|_| Err(Error::TaskFailure(format!("worker panicked on {label}"))));
            match outcome {
                Ok(output) => {
                    if self.outputs.send(output).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(task = %label, error = %err, "task failed");
                    let _ = self.errors.try_send(err);
                    self.cancel.store(true, Ordering::Relaxed);
                    break;
                }
            }
            let completed = self.counters.completed.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(progress) = &self.progress {
                let _ = progress.try_send(ProgressInfo {
                    total_tasks: self.counters.total.load(Ordering::Relaxed),
                    total_tasks_known: self.counters.known.load(Ordering::Relaxed),
                    completed_tasks: completed,
                    elapsed: self.started.elapsed(),
                    message: label,
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
