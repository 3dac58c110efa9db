//! Exact, overflow-free summation of `i64` sequences by fan-out/fan-in.
//!
//! The input is split into balanced contiguous chunks ([`partition`]), each
//! chunk is summed on its own worker into a [`BigInt`], and the partial sums
//! are combined only once every worker has reported.
//!
//! ```
//! use chunksum::parallel_sum;
//! use num_bigint::BigInt;
//!
//! let data: Vec<i64> = (0..2_000_000).map(|i| i % 1000).collect();
//! assert_eq!(parallel_sum(&data, 8), BigInt::from(999_000_000));
//! ```

pub mod bench;
pub mod dataset;
pub mod error;
pub mod parallel;
pub mod partition;
mod progress;
pub mod reduce;

pub use num_bigint::BigInt;

pub use error::SumError;
pub use parallel::{parallel_sum, ParallelProcessor};
pub use partition::{partition, Chunk};
pub use reduce::{chunk_sum, sequential_sum, Handoff};
