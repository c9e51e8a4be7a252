//! Fixed-size pool of OS worker threads.
//!
//! Each worker builds its own resource (a [`ToolBox`](crate::ToolBox) in
//! practice) on its own thread and keeps it until the pool shuts down.
//! Workers run one task at a time, to completion, pulling from a shared
//! bounded queue.

use crate::queue::JobQueue;
use funnel_error::{FunnelError, Result};
use funnel_types::PoolConfig;
use std::any::Any;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{Dispatch, debug, error, info, info_span};

/// A unit of work executed against a worker's private resource.
pub trait Task<R>: Send + 'static {
    /// Run the task to a terminal state.
    fn execute(self, resource: &mut R);
}

/// Worker pool parametric over the task type and per-worker resource.
///
/// `submit` blocks while `max_jobs` tasks are queued or executing; `join`
/// blocks until every submitted task has finished.
pub struct WorkerPool<T, R> {
    queue: Arc<JobQueue<T>>,
    handles: Vec<JoinHandle<()>>,
    _resource: PhantomData<fn() -> R>,
}

impl<T, R> WorkerPool<T, R>
where
    T: Task<R>,
    R: 'static,
{
    /// Start `config.thread_count` workers, each owning `factory(worker_id)`.
    ///
    /// The calling thread's tracing dispatcher is installed in every worker,
    /// so worker logs go wherever the pool's creator logs.
    pub fn new<F>(config: &PoolConfig, factory: F) -> Result<Self>
    where
        F: Fn(usize) -> R + Send + Sync + 'static,
    {
        config.validate().map_err(FunnelError::Config)?;

        let max_jobs = config.effective_max_jobs();
        let queue = Arc::new(JobQueue::new(max_jobs));
        let factory = Arc::new(factory);
        let dispatch = tracing::dispatcher::get_default(Dispatch::clone);
        let span = info_span!("funnel_pool", threads = config.thread_count, max_jobs);

        let mut pool = Self {
            queue,
            handles: Vec::with_capacity(config.thread_count),
            _resource: PhantomData,
        };

        for worker_id in 0..config.thread_count {
            let queue = pool.queue.clone();
            let factory = factory.clone();
            let dispatch = dispatch.clone();
            let span = span.clone();

            let spawned = thread::Builder::new()
                .name(format!("funnel-worker-{worker_id}"))
                .spawn(move || {
                    tracing::dispatcher::with_default(&dispatch, || {
                        let _entered = span.enter();
                        worker_loop(worker_id, &queue, factory(worker_id));
                    })
                });

            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(e) => {
                    // Dropping the pool closes the queue and joins the
                    // workers spawned so far.
                    return Err(FunnelError::Other(anyhow::anyhow!(
                        "failed to spawn worker {worker_id}: {e}"
                    )));
                }
            }
        }

        info!(threads = config.thread_count, max_jobs, "Started worker pool");
        Ok(pool)
    }

    /// Queue a task, blocking while the in-flight limit is reached.
    pub fn submit(&self, task: T) -> Result<()> {
        self.queue.push(task).map_err(|_| FunnelError::PoolShutdown)
    }

    /// Block until every submitted task has reached a terminal state.
    pub fn join(&self) {
        self.queue.wait_idle();
    }

    /// Number of worker threads.
    pub fn thread_count(&self) -> usize {
        self.handles.len()
    }

    /// In-flight task limit.
    pub fn max_jobs(&self) -> usize {
        self.queue.max_in_flight()
    }

    /// Tasks currently queued or executing.
    pub fn in_flight(&self) -> usize {
        self.queue.in_flight()
    }

    /// Finish queued tasks, then stop and join every worker.
    pub fn shutdown(mut self) {
        self.close_and_join();
    }

    fn close_and_join(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        self.queue.close();
        for (worker_id, handle) in self.handles.drain(..).enumerate() {
            if handle.join().is_err() {
                error!(worker = worker_id, "Worker thread panicked");
            }
        }
        debug!("Worker pool stopped");
    }
}

impl<T, R> Drop for WorkerPool<T, R> {
    fn drop(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        self.queue.close();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop<T: Task<R>, R>(worker_id: usize, queue: &JobQueue<T>, mut resource: R) {
    debug!(worker = worker_id, "Worker thread started");

    while let Some(task) = queue.pop() {
        let result = panic::catch_unwind(AssertUnwindSafe(|| task.execute(&mut resource)));
        if let Err(payload) = result {
            error!(
                worker = worker_id,
                panic = %panic_message(payload.as_ref()),
                "Task panicked"
            );
        }
        queue.task_done();
    }

    debug!(worker = worker_id, "Worker thread stopped");
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
