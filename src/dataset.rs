use num_bigint::BigInt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::info;

use crate::error::{Result, SumError};

pub const DEFAULT_LEN: usize = 2_000_000;
pub const DEFAULT_MODULUS: i64 = 1000;

/// Shape of a generated input sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// `data[i] = i mod modulus`
    Modulo { modulus: i64 },
    /// Every element equals `value`.
    Constant { value: i64 },
    /// Uniform in `[min, max]`. A missing seed is drawn at random and logged.
    Random { min: i64, max: i64, seed: Option<u64> },
}

impl Default for Pattern {
    fn default() -> Self {
        Pattern::Modulo {
            modulus: DEFAULT_MODULUS,
        }
    }
}

impl Pattern {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Pattern::Modulo { modulus } if modulus <= 0 => Err(SumError::InvalidPattern(
                format!("modulus must be positive, got {modulus}"),
            )),
            Pattern::Random { min, max, .. } if min > max => Err(SumError::InvalidPattern(
                format!("min {min} is greater than max {max}"),
            )),
            _ => Ok(()),
        }
    }

    /// Closed-form total of the first `len` elements, where one exists.
    pub fn expected_sum(&self, len: usize) -> Option<BigInt> {
        match *self {
            Pattern::Modulo { modulus } => {
                let len = BigInt::from(len);
                let m = BigInt::from(modulus);
                let one = BigInt::from(1);
                let two = BigInt::from(2);
                let full = &len / &m;
                let rem = &len % &m;

                let cycle = &m * (&m - &one) / &two;
                let tail = &rem * (&rem - &one) / &two;
                Some(full * cycle + tail)
            }
            Pattern::Constant { value } => Some(BigInt::from(value) * BigInt::from(len)),
            Pattern::Random { .. } => None,
        }
    }
}

pub fn generate(pattern: Pattern, len: usize) -> Result<Vec<i64>> {
    pattern.validate()?;

    let data: Vec<i64> = match pattern {
        Pattern::Modulo { modulus } => {
            let modulus = modulus as u64;
            (0..len)
                .into_par_iter()
                .map(|i| (i as u64 % modulus) as i64)
                .collect()
        }
        Pattern::Constant { value } => vec![value; len],
        Pattern::Random { min, max, seed } => {
            let seed = seed.unwrap_or_else(rand::random);
            info!(seed, "generating random data");

            let mut rng = StdRng::seed_from_u64(seed);
            (0..len).map(|_| rng.random_range(min..=max)).collect()
        }
    };

    Ok(data)
}
