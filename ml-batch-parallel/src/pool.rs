//! The worker pool used for per-record conversion

use std::fmt;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::info;

use crate::error::{Error, Result};

/// Configuration for a [`WorkerPool`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Number of worker threads; `None` picks one less than the number of CPUs
    pub num_threads: Option<usize>,

    /// Prefix for worker thread names
    pub thread_name_prefix: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            thread_name_prefix: "ml-batch-worker".to_string(),
        }
    }
}

impl WorkerPoolConfig {
    /// A configuration with an explicit thread count
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
            ..Self::default()
        }
    }

    /// The thread count the pool will be built with, never below 1
    pub fn resolved_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(default_threads).max(1)
    }
}

/// One less than the number of logical CPUs, and at least 1
pub fn default_threads() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

/// A fixed-size pool of worker threads
///
/// The pool is never resized. [`WorkerPool::shutdown`] releases the threads;
/// any later work fails with [`Error::PoolShutdown`]. Dropping the pool
/// releases them as well.
pub struct WorkerPool {
    pool: Option<ThreadPool>,
    num_threads: usize,
}

impl WorkerPool {
    /// Build a pool from `config`
    pub fn new(config: &WorkerPoolConfig) -> Result<Self> {
        let num_threads = config.resolved_threads();
        let prefix = config.thread_name_prefix.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(move |index| format!("{prefix}-{index}"))
            .build()?;

        info!(num_threads, "worker pool started");
        Ok(Self {
            pool: Some(pool),
            num_threads,
        })
    }

    /// Build a pool with `num_threads` workers
    pub fn with_threads(num_threads: usize) -> Result<Self> {
        Self::new(&WorkerPoolConfig::with_threads(num_threads))
    }

    /// Number of worker threads
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Whether [`WorkerPool::shutdown`] has been called
    pub fn is_shutdown(&self) -> bool {
        self.pool.is_none()
    }

    /// Run `op` inside the pool, so rayon parallel iterators use its workers
    pub fn install<OP, R>(&self, op: OP) -> Result<R>
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        let pool = self.pool.as_ref().ok_or(Error::PoolShutdown)?;
        Ok(pool.install(op))
    }

    /// Release the worker threads; calling this again does nothing
    pub fn shutdown(&mut self) {
        if self.pool.take().is_some() {
            info!(num_threads = self.num_threads, "worker pool shut down");
        }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("num_threads", &self.num_threads)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
