//! Bounded job queue shared by the worker threads.
//!
//! The bound counts jobs that are queued *or* executing: a slot is taken on
//! push and only released when a worker reports the job done. This is what
//! makes `submit` block while `max_in_flight` jobs are outstanding.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

struct QueueState<T> {
    jobs: VecDeque<T>,
    in_flight: usize,
    closed: bool,
}

pub(crate) struct JobQueue<T> {
    state: Mutex<QueueState<T>>,
    job_ready: Condvar,
    slot_free: Condvar,
    idle: Condvar,
    max_in_flight: usize,
}

impl<T> JobQueue<T> {
    pub(crate) fn new(max_in_flight: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                in_flight: 0,
                closed: false,
            }),
            job_ready: Condvar::new(),
            slot_free: Condvar::new(),
            idle: Condvar::new(),
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Enqueue a job, blocking while the in-flight limit is reached.
    ///
    /// Returns the job back if the queue has been closed.
    pub(crate) fn push(&self, job: T) -> Result<(), T> {
        let mut state = self.state.lock();
        while state.in_flight >= self.max_in_flight && !state.closed {
            self.slot_free.wait(&mut state);
        }
        if state.closed {
            return Err(job);
        }

        state.jobs.push_back(job);
        state.in_flight += 1;
        drop(state);

        self.job_ready.notify_one();
        Ok(())
    }

    /// Take the next job, blocking until one is available.
    ///
    /// Returns `None` once the queue is closed and empty.
    pub(crate) fn pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(job) = state.jobs.pop_front() {
                return Some(job);
            }
            if state.closed {
                return None;
            }
            self.job_ready.wait(&mut state);
        }
    }

    /// Release the slot of a job that reached a terminal state.
    pub(crate) fn task_done(&self) {
        let mut state = self.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        let idle = state.in_flight == 0;
        drop(state);

        self.slot_free.notify_one();
        if idle {
            self.idle.notify_all();
        }
    }

    /// Block until every pushed job has been reported done.
    pub(crate) fn wait_idle(&self) {
        let mut state = self.state.lock();
        while state.in_flight > 0 {
            self.idle.wait(&mut state);
        }
    }

    /// Stop accepting jobs and wake every waiter.
    ///
    /// Jobs already queued are still handed out by [`pop`](Self::pop).
    pub(crate) fn close(&self) {
        self.state.lock().closed = true;
        self.job_ready.notify_all();
        self.slot_free.notify_all();
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}
