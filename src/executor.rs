//! The task-submission abstraction [`Universe::advance_to`](crate::universe::Universe::advance_to)
//! drives, plus the quiescence barrier and minimal `Future` it returns.
//!
//! The engine deliberately does not depend on an async runtime: `tokio`/`async-std` appear
//! nowhere in the dependency graph this crate grew from, and pulling one in purely to await a
//! handful of worker-thread completions would be a heavier dependency than the problem calls for.
//! [`ThreadPoolExecutor`] instead generalizes the work-distribution primitive this crate already
//! used for its own parallel workloads (`job_market::JobBroker`) into a small, reusable
//! submit-a-job abstraction.

use crate::error::EngineResult;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// A boxed unit of work submitted to an [`Executor`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// An external task executor. The engine never constructs its own thread pool (thread pool
/// construction is explicitly out of scope); callers supply one, of which [`ThreadPoolExecutor`]
/// is a minimal ready-made option.
pub trait Executor: Send + Sync {
    /// Submits `job` for eventual, unordered execution on some worker. Must not block the
    /// calling thread waiting for the job to run.
    fn submit(&self, job: Job);
}

struct PoolState {
    queue: VecDeque<Job>,
    shutdown: bool,
}

/// A fixed-size thread pool `Executor`, generalized from this crate's own `job_market::JobBroker`
/// work-distribution primitive: a shared queue guarded by a `parking_lot::Mutex`, with workers
/// parked on a `Condvar` until work or shutdown arrives.
pub struct ThreadPoolExecutor {
    state: Arc<Mutex<PoolState>>,
    has_jobs: Arc<Condvar>,
    workers: Vec<std::thread::JoinHandle<()>>,
}

impl ThreadPoolExecutor {
    /// Spawns `thread_count` worker threads, each blocked on the shared job queue.
    pub fn new(thread_count: usize) -> Self {
        let state = Arc::new(Mutex::new(PoolState { queue: VecDeque::new(), shutdown: false }));
        let has_jobs = Arc::new(Condvar::new());
        let mut workers = Vec::with_capacity(thread_count);
        for index in 0..thread_count {
            let state = Arc::clone(&state);
            let has_jobs = Arc::clone(&has_jobs);
            let handle = std::thread::Builder::new()
                .name(format!("engine-executor-{index}"))
                .spawn(move || worker_loop(state, has_jobs))
                .expect("failed to spawn executor worker thread");
            workers.push(handle);
        }
        Self { state, has_jobs, workers }
    }
}

fn worker_loop(state: Arc<Mutex<PoolState>>, has_jobs: Arc<Condvar>) {
    loop {
        let job = {
            let mut guard = state.lock();
            loop {
                if let Some(job) = guard.queue.pop_front() {
                    break Some(job);
                }
                if guard.shutdown {
                    break None;
                }
                has_jobs.wait(&mut guard);
            }
        };
        match job {
            Some(job) => job(),
            None => {
                log::trace!("{}: shutting down", std::thread::current().name().unwrap_or_default());
                break;
            }
        }
    }
}

impl Executor for ThreadPoolExecutor {
    fn submit(&self, job: Job) {
        let mut guard = self.state.lock();
        guard.queue.push_back(job);
        self.has_jobs.notify_one();
    }
}

impl Drop for ThreadPoolExecutor {
    fn drop(&mut self) {
        {
            let mut guard = self.state.lock();
            guard.shutdown = true;
            guard.queue.clear();
        }
        self.has_jobs.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

struct QuiescenceState {
    done: bool,
    waker: Option<Waker>,
    error: Option<crate::error::EngineError>,
}

/// The work-counting quiescence barrier behind `Universe::advance_to`: the count starts at the
/// number of initially submitted per-actor tasks, is incremented before each re-submission a
/// dirtied actor causes, and decremented when a task completes. It reaches zero exactly when no
/// actor has more work to do for the current deadline.
pub(crate) struct Quiescence {
    remaining: AtomicIsize,
    state: Mutex<QuiescenceState>,
    condvar: Condvar,
}

impl Quiescence {
    pub(crate) fn new(initial_tasks: isize) -> Arc<Self> {
        Arc::new(Self {
            remaining: AtomicIsize::new(initial_tasks),
            state: Mutex::new(QuiescenceState { done: initial_tasks == 0, waker: None, error: None }),
            condvar: Condvar::new(),
        })
    }

    /// Call before submitting a follow-up task (e.g. re-submitting a dirtied actor).
    pub(crate) fn task_started(&self) {
        self.remaining.fetch_add(1, Ordering::SeqCst);
    }

    /// Call when a submitted task completes, whether or not it produced further work.
    pub(crate) fn task_finished(&self) {
        if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.mark_done(None);
        }
    }

    /// Call when a task observes a fatal error; terminates the barrier immediately rather than
    /// waiting for the remaining count to reach zero.
    pub(crate) fn fail(&self, err: crate::error::EngineError) {
        self.mark_done(Some(err));
    }

    fn mark_done(&self, error: Option<crate::error::EngineError>) {
        let mut state = self.state.lock();
        if state.done {
            return;
        }
        state.done = true;
        state.error = error;
        if let Some(waker) = state.waker.take() {
            waker.wake();
        }
        self.condvar.notify_all();
    }
}

/// The future returned by [`Universe::advance_to`](crate::universe::Universe::advance_to).
/// Resolves once its [`Quiescence`] barrier reaches zero in-flight tasks with no further work
/// produced. Also offers [`AdvanceHandle::join`], a blocking convenience for callers not already
/// in an async context — mirroring the blocking `.join()` this crate's own `checker` modules
/// expose over `crossbeam_utils::thread::scope`.
pub struct AdvanceHandle {
    pub(crate) quiescence: Arc<Quiescence>,
}

impl std::future::Future for AdvanceHandle {
    type Output = EngineResult<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.quiescence.state.lock();
        if state.done {
            Poll::Ready(state.error.take().map_or(Ok(()), Err))
        } else {
            state.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

impl AdvanceHandle {
    /// Blocks the calling thread until advancement completes.
    pub fn join(self) -> EngineResult<()> {
        let mut state = self.quiescence.state.lock();
        while !state.done {
            self.quiescence.condvar.wait(&mut state);
        }
        state.error.take().map_or(Ok(()), Err)
    }
}
