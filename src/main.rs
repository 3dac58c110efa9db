use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use chunksum::bench;
use chunksum::dataset::{self, Pattern, DEFAULT_LEN, DEFAULT_MODULUS};
use chunksum::{Handoff, ParallelProcessor, SumError};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PatternKind {
    /// data[i] = i mod MODULUS
    Modulo,
    /// Every element equals VALUE
    Constant,
    /// Uniform random values in [MIN, MAX]
    Random,
}

#[derive(Parser, Debug)]
#[command(name = "chunksum")]
#[command(about = "Sum a large i64 sequence across worker threads without overflow", long_about = None)]
struct Args {
    /// Number of elements to generate
    #[arg(short = 'n', long, default_value_t = DEFAULT_LEN)]
    len: usize,

    /// Number of chunks summed concurrently (defaults to number of CPU cores)
    #[arg(short = 'j', long, value_parser = clap::value_parser!(u32).range(1..))]
    threads: Option<u32>,

    /// How generated data is shaped
    #[arg(short, long, value_enum, default_value_t = PatternKind::Modulo)]
    pattern: PatternKind,

    /// Modulus for the modulo pattern
    #[arg(long, default_value_t = DEFAULT_MODULUS, allow_hyphen_values = true)]
    modulus: i64,

    /// Element value for the constant pattern
    #[arg(long, default_value_t = 9_000_000_000_000_000_000, allow_hyphen_values = true)]
    value: i64,

    /// Lower bound for the random pattern
    #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
    min: i64,

    /// Upper bound for the random pattern
    #[arg(long, default_value_t = 100, allow_hyphen_values = true)]
    max: i64,

    /// Seed for the random pattern
    #[arg(long)]
    seed: Option<u64>,

    /// How workers hand partial sums to the aggregator
    #[arg(long, value_enum, default_value_t = Handoff::default())]
    handoff: Handoff,

    /// Number of timed parallel runs
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    runs: u32,

    /// Disable progress bar
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn pattern(&self) -> Pattern {
        match self.pattern {
            PatternKind::Modulo => Pattern::Modulo {
                modulus: self.modulus,
            },
            PatternKind::Constant => Pattern::Constant { value: self.value },
            PatternKind::Random => Pattern::Random {
                min: self.min,
                max: self.max,
                seed: self.seed,
            },
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(verbose >= 2)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    debug!(?args, "parsed arguments");

    let pattern = args.pattern();

    let start_time = Instant::now();
    let data = dataset::generate(pattern, args.len).context("Failed to generate input data")?;
    println!(
        "Generated {} elements ({:?}) in {:.2?}",
        data.len(),
        pattern,
        start_time.elapsed()
    );

    // Setup parallel processor
    let processor = ParallelProcessor::new(args.threads.map(|t| t as usize), args.handoff)
        .context("Failed to set up worker pool")?;
    println!(
        "Using {} chunks on {} worker threads ({:?} handoff)",
        processor.num_workers(),
        processor.pool_threads(),
        processor.handoff()
    );

    let report = match bench::run(&processor, &data, args.runs as usize, !args.quiet) {
        Ok(report) => report,
        Err(err @ (SumError::Mismatch { .. } | SumError::Nondeterministic { .. })) => {
            anyhow::bail!("Verification failed: {err}");
        }
        Err(err) => return Err(err.into()),
    };

    println!("\nTotal sum is {}", report.total);
    println!(
        "Parallel: best {:.2?}, mean {:.2?} over {} run(s)",
        report.best, report.mean, report.runs
    );
    println!("Sequential check matched in {:.2?}", report.sequential);
    println!("Speedup: {:.2}x", report.speedup());

    if let Some(expected) = pattern.expected_sum(data.len()) {
        if expected != report.total {
            anyhow::bail!(
                "Verification failed: total {} differs from closed form {}",
                report.total,
                expected
            );
        }
        println!("Closed-form total matched");
    }

    Ok(())
}
