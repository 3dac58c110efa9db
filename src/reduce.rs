//! Worker and aggregator halves of the fan-out/fan-in sum.
//!
//! Every strategy dispatches one task per [`Chunk`] onto the current rayon
//! pool (the global pool unless called inside [`rayon::ThreadPool::install`])
//! and feeds the partial sums through an [`Aggregator`], which refuses to hand
//! out a total until each chunk has been accounted for exactly once.

use std::sync::mpsc;

use clap::ValueEnum;
use indicatif::ProgressBar;
use num_bigint::BigInt;
use num_traits::Zero;
use rayon::prelude::*;
use tracing::{debug, debug_span, trace};

use crate::partition::Chunk;

/// How partial sums travel from the workers to the aggregator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Handoff {
    /// Bounded channel sized to the chunk count, closed after every worker joined.
    #[default]
    Channel,
    /// One result slot per chunk, read after the completion barrier.
    Slots,
    /// Rayon parallel iterator map/reduce over the chunk list.
    Reduce,
}

/// Machine-width running sum that spills into a [`BigInt`] before overflowing.
#[derive(Debug, Default)]
struct Accumulator {
    spilled: BigInt,
    acc: i128,
}

impl Accumulator {
    fn add(&mut self, value: i128) {
        match self.acc.checked_add(value) {
            Some(next) => self.acc = next,
            None => {
                self.spilled += BigInt::from(self.acc);
                self.acc = value;
            }
        }
    }

    fn into_total(self) -> BigInt {
        self.spilled + BigInt::from(self.acc)
    }
}

/// Exact sum of the elements covered by `chunk`.
///
/// # Panics
///
/// Panics if `chunk` reaches past the end of `data`.
pub fn chunk_sum(data: &[i64], chunk: &Chunk) -> BigInt {
    let mut acc = Accumulator::default();
    for &value in &data[chunk.range()] {
        acc.add(i128::from(value));
    }
    acc.into_total()
}

/// Single-threaded reference sum, independent of the chunked path.
pub fn sequential_sum(data: &[i64]) -> BigInt {
    data.iter().fold(BigInt::zero(), |acc, &value| acc + value)
}

/// Collects partial sums and tracks which chunks have reported.
#[derive(Debug)]
pub struct Aggregator {
    total: BigInt,
    received: Vec<bool>,
    pending: usize,
}

impl Aggregator {
    pub fn new(expected: usize) -> Self {
        Self {
            total: BigInt::zero(),
            received: vec![false; expected],
            pending: expected,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    /// # Panics
    ///
    /// Panics if `index` is unknown or was already accepted.
    pub fn accept(&mut self, index: usize, partial: BigInt) {
        let seen = self
            .received
            .get_mut(index)
            .unwrap_or_else(|| panic!("partial sum for unknown chunk {index}"));
        assert!(!*seen, "chunk {index} published more than once");

        *seen = true;
        self.pending -= 1;
        self.total += partial;
        trace!(chunk = index, pending = self.pending, "partial accepted");
    }

    /// # Panics
    ///
    /// Panics if any chunk never reported.
    pub fn finish(self) -> BigInt {
        assert_eq!(
            self.pending, 0,
            "{} chunk(s) never published a partial sum",
            self.pending
        );
        self.total
    }
}

/// Sum `data` over `chunks` on the current rayon pool, handing results off
/// per `handoff`. Returns only after every chunk task has finished.
pub fn reduce(
    data: &[i64],
    chunks: &[Chunk],
    handoff: Handoff,
    progress: Option<&ProgressBar>,
) -> BigInt {
    if chunks.is_empty() {
        return BigInt::zero();
    }

    let span = debug_span!("reduce", ?handoff, chunks = chunks.len());
    let _guard = span.enter();

    match handoff {
        Handoff::Channel => via_channel(data, chunks, progress),
        Handoff::Slots => via_slots(data, chunks, progress),
        Handoff::Reduce => via_par_iter(data, chunks, progress),
    }
}

fn run_worker(data: &[i64], chunk: Chunk, progress: Option<&ProgressBar>) -> BigInt {
    let partial = chunk_sum(data, &chunk);
    debug!(
        chunk = chunk.index,
        start = chunk.start,
        end = chunk.end,
        %partial,
        "chunk summed"
    );

    if let Some(pb) = progress {
        pb.inc(chunk.len() as u64);
    }

    partial
}

fn via_channel(
    data: &[i64],
    chunks: &[Chunk],
    progress: Option<&ProgressBar>,
) -> BigInt {
    // Capacity covers every chunk, so no worker ever waits on the consumer.
    let (tx, rx) = mpsc::sync_channel::<(usize, BigInt)>(chunks.len());

    rayon::scope(|scope| {
        for &chunk in chunks {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let partial = run_worker(data, chunk, progress);
                tx.send((chunk.index, partial))
                    .expect("receiver is held until all workers have joined");
            });
        }
    });

    // Every worker has joined; dropping the last sender ends production.
    drop(tx);

    let mut aggregator = Aggregator::new(chunks.len());
    for (index, partial) in rx {
        aggregator.accept(index, partial);
    }
    aggregator.finish()
}

fn via_slots(
    data: &[i64],
    chunks: &[Chunk],
    progress: Option<&ProgressBar>,
) -> BigInt {
    let mut slots: Vec<Option<BigInt>> = vec![None; chunks.len()];

    rayon::scope(|scope| {
        for (slot, &chunk) in slots.iter_mut().zip(chunks) {
            scope.spawn(move |_| {
                *slot = Some(run_worker(data, chunk, progress));
            });
        }
    });

    let mut aggregator = Aggregator::new(chunks.len());
    for (chunk, slot) in chunks.iter().zip(slots) {
        if let Some(partial) = slot {
            aggregator.accept(chunk.index, partial);
        }
    }
    aggregator.finish()
}

fn via_par_iter(
    data: &[i64],
    chunks: &[Chunk],
    progress: Option<&ProgressBar>,
) -> BigInt {
    let (total, reported) = chunks
        .par_iter()
        .map(|&chunk| (run_worker(data, chunk, progress), 1usize))
        .reduce(
            || (BigInt::zero(), 0),
            |(a, n), (b, m)| (a + b, n + m),
        );

    assert_eq!(
        reported,
        chunks.len(),
        "{reported} of {} chunks reported a partial sum",
        chunks.len()
    );
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;

    fn pool(threads: usize) -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap()
    }

    #[test]
    fn test_chunk_sum_covers_only_its_range() {
        let data: Vec<i64> = (1..=10).collect();
        let chunk = Chunk { index: 0, start: 2, end: 5 };
        assert_eq!(chunk_sum(&data, &chunk), BigInt::from(3 + 4 + 5));
    }

    #[test]
    fn test_extreme_values() {
        let data = vec![i64::MAX; 4];
        let chunk = Chunk { index: 0, start: 0, end: 4 };
        assert_eq!(
            chunk_sum(&data, &chunk),
            BigInt::from(i64::MAX) * BigInt::from(4)
        );

        let data = vec![i64::MIN, i64::MIN, i64::MAX];
        let chunk = Chunk { index: 0, start: 0, end: 3 };
        assert_eq!(
            chunk_sum(&data, &chunk),
            BigInt::from(i64::MIN) * BigInt::from(2) + BigInt::from(i64::MAX)
        );
    }

    #[test]
    fn test_accumulator_spills_before_overflow() {
        let mut acc = Accumulator {
            spilled: BigInt::zero(),
            acc: i128::MAX - 1,
        };
        acc.add(5);
        acc.add(i128::MAX);

        let expected = BigInt::from(i128::MAX) * BigInt::from(2) + BigInt::from(4);
        assert_eq!(acc.into_total(), expected);

        let mut acc = Accumulator {
            spilled: BigInt::zero(),
            acc: i128::MIN,
        };
        acc.add(-1);
        assert_eq!(acc.into_total(), BigInt::from(i128::MIN) - BigInt::from(1));
    }

    #[test]
    #[should_panic]
    fn test_chunk_sum_out_of_range_is_fatal() {
        let data = vec![1i64, 2, 3];
        let chunk = Chunk { index: 0, start: 1, end: 9 };
        chunk_sum(&data, &chunk);
    }

    #[test]
    fn test_sequential_sum() {
        assert_eq!(sequential_sum(&[]), BigInt::zero());
        assert_eq!(sequential_sum(&[-5, 7, 3]), BigInt::from(5));
    }

    #[test]
    fn test_every_handoff_matches_sequential() {
        let data: Vec<i64> = (0..10_007).map(|i| (i % 97) - 40).collect();
        let expected = sequential_sum(&data);
        let chunks = partition(data.len(), 6);
        let pool = pool(6);

        for handoff in [Handoff::Channel, Handoff::Slots, Handoff::Reduce] {
            assert_eq!(
                pool.install(|| reduce(&data, &chunks, handoff, None)),
                expected,
                "{handoff:?}"
            );
        }
    }

    #[test]
    fn test_more_chunks_than_pool_threads() {
        let data: Vec<i64> = (0..1000).collect();
        let chunks = partition(data.len(), 32);
        let pool = pool(2);

        for handoff in [Handoff::Channel, Handoff::Slots, Handoff::Reduce] {
            assert_eq!(
                pool.install(|| reduce(&data, &chunks, handoff, None)),
                BigInt::from(499_500)
            );
        }
    }

    #[test]
    fn test_many_chunks_on_global_pool() {
        let data = vec![1i64; 50_000];
        let chunks = partition(data.len(), data.len());

        for handoff in [Handoff::Channel, Handoff::Slots, Handoff::Reduce] {
            assert_eq!(
                reduce(&data, &chunks, handoff, None),
                BigInt::from(50_000),
                "{handoff:?}"
            );
        }
    }

    #[test]
    fn test_no_chunks_is_zero() {
        assert_eq!(
            reduce(&[1, 2, 3], &[], Handoff::Channel, None),
            BigInt::zero()
        );
    }

    #[test]
    fn test_progress_counts_elements() {
        let data = vec![1i64; 500];
        let chunks = partition(data.len(), 4);
        let pb = ProgressBar::hidden();
        pb.set_length(data.len() as u64);

        pool(4).install(|| reduce(&data, &chunks, Handoff::Slots, Some(&pb)));
        assert_eq!(pb.position(), 500);
    }

    #[test]
    fn test_aggregator_accepts_in_any_order() {
        let mut aggregator = Aggregator::new(3);
        aggregator.accept(2, BigInt::from(30));
        aggregator.accept(0, BigInt::from(10));
        assert_eq!(aggregator.pending(), 1);
        aggregator.accept(1, BigInt::from(20));
        assert_eq!(aggregator.finish(), BigInt::from(60));
    }

    #[test]
    #[should_panic(expected = "published more than once")]
    fn test_aggregator_rejects_duplicates() {
        let mut aggregator = Aggregator::new(2);
        aggregator.accept(0, BigInt::from(1));
        aggregator.accept(0, BigInt::from(1));
    }

    #[test]
    #[should_panic(expected = "never published")]
    fn test_aggregator_refuses_early_finish() {
        let mut aggregator = Aggregator::new(2);
        aggregator.accept(1, BigInt::from(1));
        aggregator.finish();
    }
}
