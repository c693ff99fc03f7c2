//! Process watchdog with a pluggable, timer-driven task scheduler.
//!
//! Two processes monitor each other: the guarded program and a `wd-exec`
//! peer it forks on [`wd::start`]. Each side periodically pulses the other
//! with SIGUSR1 and counts how many of its own pulses have gone
//! unacknowledged; once that count crosses a threshold, the side that
//! noticed recovers its peer (re-forking a fresh watchdog, or exec'ing
//! straight into the guarded program's own binary) rather than waiting for
//! an external supervisor to notice.
//!
//! The mutual-monitoring loop itself is just an application of the
//! lower-level [`scheduler`] module: a single recurring task that sends the
//! pulse and checks the miss count, hosted in a min-heap-backed event loop
//! ([`heap`], [`task`]) that is equally usable on its own for any
//! timer-driven recurring work.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! procwatch::wd::start(3, Duration::from_secs(1)).expect("failed to start watchdog");
//! ```

pub mod error;
pub mod heap;
pub mod scheduler;
pub mod task;
pub mod uid;
pub mod wd;

pub use error::{WdError, WdResult};
pub use scheduler::{Scheduler, SchedulerControl, Status};
pub use task::{Task, TaskOutcome};
pub use uid::Uid;
