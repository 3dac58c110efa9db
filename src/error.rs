use num_bigint::BigInt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SumError {
    #[error("failed to start worker pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid data pattern: {0}")]
    InvalidPattern(String),

    #[error("parallel sum {parallel} does not match sequential sum {sequential}")]
    Mismatch { parallel: BigInt, sequential: BigInt },

    #[error("parallel runs disagree: first run returned {first}, a later run returned {other}")]
    Nondeterministic { first: BigInt, other: BigInt },
}

pub type Result<T> = std::result::Result<T, SumError>;
