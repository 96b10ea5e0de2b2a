//! Chunk dispatch: map a task over N independent chunks and collect results
//! in submission order.
//!
//! The orchestrator never depends on which runner is active; a runner only
//! promises ordered fan-out/fan-in. [`Serial`] is the degenerate single-chunk
//! case and the correctness reference, [`WorkerPool`] fans out over a
//! dedicated rayon pool.

use rayon::prelude::*;

/// Run `task` for every chunk index and collect results in order.
///
/// Chunks are fully independent: no shared mutable state, no communication
/// during computation. The only blocking point is waiting for the full set
/// of results; there is no partial consumption, cancellation, or timeout.
pub trait ChunkRunner {
    fn run<T, F>(&self, n_tasks: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync;
}

/// In-process sequential execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Serial;

impl ChunkRunner for Serial {
    fn run<T, F>(&self, n_tasks: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        (0..n_tasks).map(task).collect()
    }
}

/// A dedicated worker pool sized for one batch call.
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Build a pool with exactly `n_workers` threads.
    ///
    /// # Errors
    ///
    /// Pool construction failure is fatal and surfaced to the caller.
    pub fn new(n_workers: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_workers)
            .build()?;
        Ok(Self { pool })
    }

    /// Number of threads in the pool.
    pub fn n_workers(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl ChunkRunner for WorkerPool {
    fn run<T, F>(&self, n_tasks: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        self.pool
            .install(|| (0..n_tasks).into_par_iter().map(|i| task(i)).collect())
    }
}

/// The runner selected for one batch call.
///
/// Below two workers there is nothing to fan out, so the call runs on
/// [`Serial`]; otherwise a [`WorkerPool`] of exactly the resolved size is
/// built for the call.
#[derive(Debug)]
pub enum Runner {
    Serial(Serial),
    Pool(WorkerPool),
}

impl Runner {
    /// Select a runner for the resolved worker count.
    ///
    /// # Errors
    ///
    /// Surfaces pool construction failure; [`Serial`] cannot fail.
    pub fn new(n_workers: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        if n_workers <= 1 {
            Ok(Self::Serial(Serial))
        } else {
            Ok(Self::Pool(WorkerPool::new(n_workers)?))
        }
    }
}

impl ChunkRunner for Runner {
    fn run<T, F>(&self, n_tasks: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        match self {
            Self::Serial(r) => r.run(n_tasks, task),
            Self::Pool(r) => r.run(n_tasks, task),
        }
    }
}
