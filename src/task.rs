//! Scheduled task: a boxed action closure plus its recurrence interval and
//! next-fire deadline.

use std::time::{Duration, Instant};

use crate::uid::Uid;

/// What a task's action wants the scheduler to do after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Re-enqueue the task with its deadline advanced by `interval`.
    Keep,
    /// Drop the task; it will not run again.
    Drop,
}

impl TaskOutcome {
    /// `0` means keep, any other value means drop — the source's
    /// `action_func` return-code contract, preserved for callers migrating
    /// from the C API.
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            TaskOutcome::Keep
        } else {
            TaskOutcome::Drop
        }
    }
}

type Action = Box<dyn FnMut() -> TaskOutcome + Send>;

/// A recurring (or self-dropping) unit of work owned by a [`Scheduler`].
///
/// [`Scheduler`]: crate::scheduler::Scheduler
pub struct Task {
    id: Uid,
    action: Action,
    interval: Duration,
    next_fire: Instant,
}

impl Task {
    /// Create a task whose first fire is `interval` from now.
    ///
    /// Returns `None` for a zero interval (Design Note 9, Open Question 3:
    /// `interval = 0` is rejected at construction rather than left
    /// unspecified).
    pub fn new(interval: Duration, action: impl FnMut() -> TaskOutcome + Send + 'static) -> Option<Self> {
        if interval.is_zero() {
            return None;
        }

        Some(Self {
            id: Uid::create(),
            action: Box::new(action),
            interval,
            next_fire: Instant::now() + interval,
        })
    }

    /// Advance the deadline by `interval`, then run the action.
    ///
    /// The deadline advances unconditionally regardless of how long the
    /// scheduler actually slept before calling this — Open Question 2's
    /// "best-effort periodic" semantics: drift forward on long sleeps,
    /// never catch up on short ones.
    pub fn run(&mut self) -> TaskOutcome {
        self.next_fire += self.interval;
        (self.action)()
    }

    pub fn id(&self) -> Uid {
        self.id
    }

    pub fn next_fire(&self) -> Instant {
        self.next_fire
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}
