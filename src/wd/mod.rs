//! Two-process mutual-monitoring watchdog built on top of the scheduler.

pub mod process;
pub mod rendezvous;
pub mod signals;
pub mod supervisor;

pub use supervisor::{run_watchdog_entry, start, Role, Supervisor};
