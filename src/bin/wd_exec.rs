//! Standalone watchdog process. Exec'd by a guarded program's `wd::start`
//! call (or by its own recovery logic) to monitor that program from the
//! outside.
//!
//! Takes the positional argv contract built by
//! `procwatch::wd::process::build_watchdog_argv`:
//! `wd-exec <interval_secs> <threshold> <original argv...>`.

use std::sync::atomic::AtomicI32;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "wd-exec")]
#[command(about = "Watchdog re-exec image; monitors the guarded program from the outside")]
struct Cli {
    /// Seconds between pulses.
    #[arg(env = "WD_INTERVAL_SECS")]
    interval_secs: u64,

    /// Missed-pulse count before a peer is presumed dead.
    #[arg(env = "WD_THRESHOLD")]
    threshold: u32,

    /// The guarded program's own argv, forwarded unchanged by
    /// `wd::process::build_watchdog_argv`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    original_argv: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // This process was just fork+exec'd directly by the guarded program, so
    // its parent pid is the peer to watch.
    let peer_pid = Arc::new(AtomicI32::new(unsafe { libc::getppid() }));

    procwatch::wd::run_watchdog_entry(
        procwatch::wd::Role::Watchdog,
        peer_pid,
        Duration::from_secs(cli.interval_secs),
        cli.threshold,
        cli.original_argv,
    )?;

    Ok(())
}
