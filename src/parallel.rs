use indicatif::ProgressBar;
use num_bigint::BigInt;
use num_traits::Zero;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::error::Result;
use crate::partition::partition;
use crate::reduce::{reduce, Handoff};

pub struct ParallelProcessor {
    num_workers: usize,
    handoff: Handoff,
    pool: ThreadPool,
}

impl ParallelProcessor {
    /// `num_workers` (the chunk count) defaults to the number of logical
    /// CPUs. Zero workers is accepted and sums every input to zero. The
    /// pool behind it never holds more threads than there are CPUs.
    pub fn new(num_workers: Option<usize>, handoff: Handoff) -> Result<Self> {
        let cpus = num_cpus::get();
        let num_workers = num_workers.unwrap_or(cpus);
        let pool = build_pool(num_workers.clamp(1, cpus))?;

        Ok(Self {
            num_workers,
            handoff,
            pool,
        })
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn handoff(&self) -> Handoff {
        self.handoff
    }

    pub fn pool_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn sum(&self, data: &[i64]) -> BigInt {
        self.sum_with_progress(data, None)
    }

    pub fn sum_with_progress(&self, data: &[i64], progress: Option<&ProgressBar>) -> BigInt {
        let chunks = partition(data.len(), self.num_workers);
        self.pool
            .install(|| reduce(data, &chunks, self.handoff, progress))
    }
}

fn build_pool(threads: usize) -> Result<ThreadPool> {
    debug!(threads, "starting worker pool");

    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("chunksum-worker-{i}"))
        .build()?;
    Ok(pool)
}

/// Exact sum of `data`, split across up to `parallelism` concurrent workers.
///
/// Each chunk becomes one task on the rayon global pool, so no threads are
/// created per call, and the call returns only after every task has
/// finished. Empty input or zero parallelism returns zero without
/// dispatching anything.
///
/// # Panics
///
/// Panics if the global pool cannot be started on first use.
pub fn parallel_sum(data: &[i64], parallelism: usize) -> BigInt {
    let chunks = partition(data.len(), parallelism);
    if chunks.is_empty() {
        return BigInt::zero();
    }

    reduce(data, &chunks, Handoff::default(), None)
}
