//! Timed comparison of the parallel sum against the sequential reference.

use std::time::{Duration, Instant};

use num_bigint::BigInt;
use tracing::{debug, info};

use crate::error::{Result, SumError};
use crate::parallel::ParallelProcessor;
use crate::progress::create_progress_bar;
use crate::reduce::{sequential_sum, Handoff};

#[derive(Debug, Clone)]
pub struct Report {
    pub total: BigInt,
    pub elements: usize,
    pub workers: usize,
    pub handoff: Handoff,
    pub runs: usize,
    pub best: Duration,
    pub mean: Duration,
    pub sequential: Duration,
}

impl Report {
    /// Sequential time over the best parallel time.
    pub fn speedup(&self) -> f64 {
        let best = self.best.as_secs_f64();
        if best == 0.0 {
            return 0.0;
        }
        self.sequential.as_secs_f64() / best
    }
}

/// Run the parallel sum `runs` times (at least once), then the sequential
/// pass, and check that every total agrees.
pub fn run(
    processor: &ParallelProcessor,
    data: &[i64],
    runs: usize,
    show_progress: bool,
) -> Result<Report> {
    let runs = runs.max(1);
    let progress = show_progress.then(|| create_progress_bar((data.len() * runs) as u64));

    let mut first: Option<BigInt> = None;
    let mut timings = Vec::with_capacity(runs);

    for run in 0..runs {
        let start = Instant::now();
        let total = processor.sum_with_progress(data, progress.as_ref());
        let elapsed = start.elapsed();
        debug!(run, ?elapsed, %total, "parallel run finished");
        timings.push(elapsed);

        match &first {
            None => first = Some(total),
            Some(expected) if *expected != total => {
                return Err(SumError::Nondeterministic {
                    first: expected.clone(),
                    other: total,
                });
            }
            Some(_) => {}
        }
    }

    if let Some(pb) = &progress {
        pb.finish_with_message("Parallel runs complete");
    }

    let start = Instant::now();
    let check = sequential_sum(data);
    let sequential = start.elapsed();
    info!(?sequential, "sequential check finished");

    let total = first.unwrap_or_default();
    if total != check {
        return Err(SumError::Mismatch {
            parallel: total,
            sequential: check,
        });
    }

    let best = timings.iter().copied().min().unwrap_or_default();
    let mean = timings.iter().sum::<Duration>() / runs as u32;

    Ok(Report {
        total,
        elements: data.len(),
        workers: processor.num_workers(),
        handoff: processor.handoff(),
        runs,
        best,
        mean,
        sequential,
    })
}
