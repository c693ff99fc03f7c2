//! Two-process mutual-monitoring supervisor: the half that runs inside the
//! guarded program ([`start`]/[`Supervisor::stop`]) and the event-loop entry
//! point shared by the in-process monitoring thread and the standalone
//! `wd-exec` binary ([`run_watchdog_entry`]).

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{WdError, WdResult};
use crate::scheduler::{Scheduler, Status};
use crate::task::TaskOutcome;
use crate::wd::process::{self, WD_ENV_VAR};
use crate::wd::rendezvous::Rendezvous;
use crate::wd::signals::{self, MISSED_PULSES, STOP_REQUESTED};

/// Which side of the relationship a [`run_watchdog_entry`] call plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Runs inside the guarded program, watching its `wd-exec` peer.
    User,
    /// Runs inside the standalone `wd-exec` binary, watching the guarded
    /// program.
    Watchdog,
}

/// Handle returned by [`start`]. Dropping it (or calling [`Supervisor::stop`]
/// explicitly) tears the whole mutual-monitoring setup down.
pub struct Supervisor {
    peer_pid: Arc<AtomicI32>,
    worker: Option<JoinHandle<WdResult<()>>>,
}

/// Start mutual monitoring: fork a `wd-exec` child to watch this process,
/// and spawn a thread in this process that watches the child back.
///
/// The current process's own `argv` is captured internally (via
/// `std::env::args()`) rather than taken as a parameter, since it is always
/// exactly "whatever this process was launched with" — the Rust-native
/// reading of the source's `argc`/`argv` parameters to `WDStart`.
///
/// Grounded on the source's `WDStart`.
pub fn start(threshold: u32, interval: Duration) -> WdResult<Supervisor> {
    let argv: Vec<String> = std::env::args().collect();
    let binary = process::watchdog_binary_path()?;
    let argv_wd = process::build_watchdog_argv(&binary, interval.as_secs(), threshold, &argv)?;

    let rendezvous = Rendezvous::open()?;

    match process::fork()? {
        None => {
            std::env::set_var(WD_ENV_VAR, std::process::id().to_string());
            let err = process::exec(&argv_wd);
            warn!(error = %err, "failed to exec watchdog binary");
            std::process::exit(1);
        }
        Some(child_pid) => {
            std::env::set_var(WD_ENV_VAR, child_pid.to_string());
            let peer_pid = Arc::new(AtomicI32::new(child_pid));

            // Wait for the forked `wd-exec` child to report itself ready.
            rendezvous.wait()?;

            let worker_peer_pid = Arc::clone(&peer_pid);
            let worker = std::thread::spawn(move || {
                run_watchdog_entry(Role::User, worker_peer_pid, interval, threshold, argv)
            });

            // Wait for this process's own monitoring thread to report ready.
            rendezvous.wait()?;

            Ok(Supervisor {
                peer_pid,
                worker: Some(worker),
            })
        }
    }
}

impl Supervisor {
    /// Signal both halves to stop and wait for the local monitoring thread
    /// to exit. Grounded on the source's `WDStop`.
    ///
    /// Errors with `WdError::NotRunning` if this supervisor was already
    /// stopped.
    pub fn stop(&mut self) -> WdResult<()> {
        let worker = self.worker.take().ok_or(WdError::NotRunning)?;

        let peer = self.peer_pid.load(Ordering::SeqCst);
        process::send_signal(peer, libc::SIGUSR2)?;
        unsafe {
            libc::raise(libc::SIGUSR2);
        }

        match worker.join() {
            Ok(result) => result?,
            Err(_) => return Err(WdError::Other("monitoring thread panicked".into())),
        }

        Rendezvous::unlink();
        Ok(())
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(err) = self.stop() {
                warn!(error = %err, "error stopping supervisor on drop");
            }
        }
    }
}

/// Run the mutual-monitoring loop for one side until it is told to stop.
/// Shared by the thread [`start`] spawns and `wd-exec`'s `main`.
///
/// Grounded on the source's `RunWatchDog`.
pub fn run_watchdog_entry(
    role: Role,
    peer_pid: Arc<AtomicI32>,
    interval: Duration,
    threshold: u32,
    original_argv: Vec<String>,
) -> WdResult<()> {
    signals::install_handlers()?;

    let rendezvous = Rendezvous::open()?;
    rendezvous.post()?;

    loop {
        let mut scheduler = Scheduler::new();
        let control = scheduler.control();
        let task_peer = Arc::clone(&peer_pid);

        scheduler.add(interval, move || {
            if STOP_REQUESTED.load(Ordering::SeqCst) {
                control.destroy();
                return TaskOutcome::Drop;
            }

            let pid = task_peer.load(Ordering::SeqCst);
            if let Err(err) = process::send_signal(pid, libc::SIGUSR1) {
                warn!(error = %err, pid, "failed to send pulse");
            }

            let missed = MISSED_PULSES.fetch_add(1, Ordering::SeqCst) + 1;
            if missed > threshold {
                control.stop();
            }

            TaskOutcome::Keep
        });

        match scheduler.run() {
            Status::Destroyed => {
                info!(?role, "watchdog loop destroyed, exiting");
                return Ok(());
            }
            Status::Stopped => {
                info!(?role, "peer presumed dead, recovering");
                recover(role, &peer_pid, interval, threshold, &original_argv)?;
            }
            Status::Error => {
                return Err(WdError::Other("scheduler loop errored".into()));
            }
            Status::Success | Status::Idle | Status::Running => {
                return Ok(());
            }
        }
    }
}

/// Recover from a presumed-dead peer. Grounded on the source's
/// `ResetIsolated`, which dispatches to `ResetWatchDog` or `ResetUser`
/// depending on which side of the relationship is recovering.
fn recover(
    role: Role,
    peer_pid: &Arc<AtomicI32>,
    interval: Duration,
    threshold: u32,
    original_argv: &[String],
) -> WdResult<()> {
    signals::reset();

    match role {
        Role::User => {
            let dead = peer_pid.load(Ordering::SeqCst);
            let _ = process::send_signal(dead, libc::SIGUSR2);
            let _ = process::reap(dead);

            let binary = process::watchdog_binary_path()?;
            let argv_wd = process::build_watchdog_argv(
                &binary,
                interval.as_secs(),
                threshold,
                original_argv,
            )?;

            match process::fork()? {
                None => {
                    std::env::set_var(WD_ENV_VAR, std::process::id().to_string());
                    let err = process::exec(&argv_wd);
                    warn!(error = %err, "failed to re-exec watchdog binary");
                    std::process::exit(1);
                }
                Some(new_pid) => {
                    peer_pid.store(new_pid, Ordering::SeqCst);
                    std::env::set_var(WD_ENV_VAR, new_pid.to_string());

                    let rendezvous = Rendezvous::open()?;
                    rendezvous.wait()?;
                    Ok(())
                }
            }
        }
        Role::Watchdog => {
            let argv = process::user_argv(original_argv)?;
            Err(process::exec(&argv))
        }
    }
}
