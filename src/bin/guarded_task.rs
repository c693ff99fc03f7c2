//! Example guarded program: starts the watchdog, does some bounded
//! "critical" work, then stops the watchdog.
//!
//! Grounded on the source's `test_wd.c`.

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "guarded-task")]
#[command(about = "Runs bounded work under watchdog supervision")]
struct Cli {
    /// Missed-pulse count before a peer is presumed dead.
    #[arg(long, env = "WD_THRESHOLD", default_value_t = 4)]
    threshold: u32,

    /// Seconds between pulses.
    #[arg(long, env = "WD_INTERVAL_SECS", default_value_t = 3)]
    interval_secs: u64,

    /// Number of counting iterations to run as stand-in critical work.
    #[arg(long, default_value_t = 10_000_000)]
    iterations: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut supervisor =
        procwatch::wd::start(cli.threshold, Duration::from_secs(cli.interval_secs))?;

    for i in 0..cli.iterations {
        if i % 1_000_000 == 0 {
            tracing::debug!(i, "still working");
        }
    }

    println!("Success");
    supervisor.stop()?;
    Ok(())
}
