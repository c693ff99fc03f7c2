//! Single-threaded cooperative event loop over a [`BinaryMinHeap`] of
//! [`Task`]s.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{debug, warn};

use crate::heap::{BinaryMinHeap, HasDeadline};
use crate::task::{Task, TaskOutcome};
use crate::uid::Uid;

impl HasDeadline for Task {
    fn deadline(&self) -> Instant {
        self.next_fire()
    }
}

/// Outcome of a completed or short-circuited `Scheduler::run` call.
///
/// Mirrors the source's `status_t`; `Running` only ever appears as a
/// transient internal state, returned immediately by a reentrant `run` call
/// while another call is already looping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Running,
    Stopped,
    Error,
    Destroyed,
    Success,
}

const SIG_CONTINUE: u8 = 0;
const SIG_STOP: u8 = 1;
const SIG_ERROR: u8 = 2;
const SIG_DESTROY: u8 = 3;

/// Cheap, cloneable handle used to stop or destroy a running [`Scheduler`]
/// from the task closures it hosts, or from another thread entirely.
///
/// Only ever flips a shared atomic — see `SPEC_FULL.md` §4.D for why this is
/// enough to satisfy the source's destroy-while-running contract without any
/// manual memory management: ordinary `Drop` frees the scheduler once `run`
/// returns or its owner goes out of scope.
#[derive(Clone)]
pub struct SchedulerControl {
    signal: Arc<AtomicU8>,
}

impl SchedulerControl {
    /// Idempotent: repeated calls before the next tick still yield exactly
    /// one `Stopped` return from `run` (`spec.md` §8, "Idempotence of stop").
    /// A pending `Destroy` always wins over a later `Stop`.
    pub fn stop(&self) {
        let _ = self.signal.compare_exchange(
            SIG_CONTINUE,
            SIG_STOP,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Request destruction. If the scheduler is mid-`run`, the loop observes
    /// this on its next iteration, returns `Status::Destroyed`, and its
    /// owner drops it normally. If `run` was never called, the signal is
    /// simply never observed and the scheduler is still freed normally by
    /// ordinary `Drop` when its owner goes out of scope.
    pub fn destroy(&self) {
        self.signal.store(SIG_DESTROY, Ordering::SeqCst);
    }
}

/// A min-heap-backed recurring task scheduler.
///
/// Tasks run to completion on whichever thread calls [`Scheduler::run`];
/// nothing here spawns threads of its own — see `wd::supervisor` for the
/// one helper thread the watchdog stack hosts the loop on.
pub struct Scheduler {
    queue: BinaryMinHeap<Task>,
    signal: Arc<AtomicU8>,
    status: Status,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            queue: BinaryMinHeap::new(),
            signal: Arc::new(AtomicU8::new(SIG_CONTINUE)),
            status: Status::Idle,
        }
    }

    /// A cheap handle for stopping/destroying this scheduler from task
    /// closures it hosts, or from another thread.
    pub fn control(&self) -> SchedulerControl {
        SchedulerControl {
            signal: Arc::clone(&self.signal),
        }
    }

    /// Create a task and enqueue it. Returns `Uid::default()` (the bad
    /// sentinel) if `interval` is zero.
    pub fn add(
        &mut self,
        interval: std::time::Duration,
        action: impl FnMut() -> TaskOutcome + Send + 'static,
    ) -> Uid {
        match Task::new(interval, action) {
            Some(task) => {
                let id = task.id();
                self.queue.push(task);
                id
            }
            None => Uid::default(),
        }
    }

    /// Remove a task by id. Returns `false` if not found — in particular, a
    /// task cannot find and remove itself this way while its own action is
    /// executing, since it is not in the queue during that window
    /// (`spec.md` §4.D). Use `TaskOutcome::Drop` for self-removal instead.
    pub fn remove(&mut self, id: Uid) -> bool {
        self.queue.erase_where(|task| task.id() == id).is_some()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop every remaining task. Safe to call from inside a running task's
    /// action: the caller is not in the queue while it executes, so it is
    /// never among the tasks cleared.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Run the event loop until `Continue` stops holding or the queue
    /// empties. Reentrant: calling this while already running just reports
    /// `Status::Running` back immediately.
    pub fn run(&mut self) -> Status {
        if self.status == Status::Running {
            return Status::Running;
        }

        self.status = Status::Running;
        self.signal.store(SIG_CONTINUE, Ordering::SeqCst);

        while self.signal.load(Ordering::SeqCst) == SIG_CONTINUE && !self.queue.is_empty() {
            self.sleep_until_next_deadline();
            self.run_next_task();
        }

        self.dispatch_signal()
    }

    fn sleep_until_next_deadline(&self) {
        let next = self.queue.peek().expect("loop guard ensures non-empty").deadline();
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        }
    }

    fn run_next_task(&mut self) {
        let mut task = self.queue.pop().expect("loop guard ensures non-empty");
        let id = task.id();
        let outcome = task.run();

        match outcome {
            TaskOutcome::Keep => {
                debug!(task = ?id, "task kept, re-enqueuing");
                self.queue.push(task);
            }
            TaskOutcome::Drop => {
                debug!(task = ?id, "task dropped itself");
            }
        }
    }

    fn dispatch_signal(&mut self) -> Status {
        self.status = match self.signal.load(Ordering::SeqCst) {
            SIG_DESTROY => Status::Destroyed,
            SIG_STOP => Status::Stopped,
            SIG_ERROR => {
                warn!("scheduler loop exited on error");
                Status::Error
            }
            _ => Status::Success,
        };
        self.status
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn empty_scheduler_run_returns_success_immediately() {
        let mut sched = Scheduler::new();
        assert!(sched.is_empty());
        assert_eq!(sched.run(), Status::Success);
        assert!(sched.is_empty());
    }

    #[test]
    fn one_shot_task_that_drops_ends_in_success_with_empty_queue() {
        let mut sched = Scheduler::new();
        sched.add(Duration::from_millis(10), || TaskOutcome::Drop);

        assert_eq!(sched.run(), Status::Success);
        assert!(sched.is_empty());
    }

    #[test]
    fn self_stopping_task_leaves_itself_in_the_queue_with_advanced_deadline() {
        let mut sched = Scheduler::new();
        let control = sched.control();

        sched.add(Duration::from_millis(10), move || {
            control.stop();
            TaskOutcome::Keep
        });

        assert_eq!(sched.run(), Status::Stopped);
        assert_eq!(sched.len(), 1);
    }

    #[test]
    fn self_destroying_task_reports_destroyed() {
        let mut sched = Scheduler::new();
        let control = sched.control();

        sched.add(Duration::from_millis(10), move || {
            control.destroy();
            TaskOutcome::Keep
        });

        assert_eq!(sched.run(), Status::Destroyed);
    }

    #[test]
    fn add_then_remove_round_trips_size() {
        let mut sched = Scheduler::new();
        let before = sched.len();

        let id = sched.add(Duration::from_secs(60), || TaskOutcome::Keep);
        assert_eq!(sched.len(), before + 1);

        assert!(sched.remove(id));
        assert_eq!(sched.len(), before);
    }

    #[test]
    fn remove_unknown_id_returns_false() {
        let mut sched = Scheduler::new();
        assert!(!sched.remove(Uid::default()));
    }

    #[test]
    fn zero_interval_add_returns_bad_uid_and_adds_nothing() {
        let mut sched = Scheduler::new();
        let id = sched.add(Duration::ZERO, || TaskOutcome::Keep);

        assert!(id.is_bad());
        assert!(sched.is_empty());
    }

    #[test]
    fn clear_drops_all_tasks() {
        let mut sched = Scheduler::new();
        for _ in 0..5 {
            sched.add(Duration::from_secs(30), || TaskOutcome::Keep);
        }

        sched.clear();

        assert!(sched.is_empty());
    }

    #[test]
    fn reentrant_run_reports_running_without_reentering_the_loop() {
        // A task cannot directly re-enter `run` from inside itself (no
        // access to `&mut Scheduler`), so this exercises the same guard via
        // the state left over from a previous stop: status must reset to
        // Idle-like behaviour only through a fresh construction, and a
        // scheduler that is genuinely mid-loop on another thread reports
        // Running to a concurrent caller. We approximate that here by
        // checking the guard directly.
        let mut sched = Scheduler::new();
        sched.status = Status::Running;
        assert_eq!(sched.run(), Status::Running);
    }

    #[test]
    fn tasks_run_in_nondecreasing_deadline_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut sched = Scheduler::new();
        for (label, millis) in [(1u32, 30), (2, 10), (3, 20)] {
            let order = Arc::clone(&order);
            sched.add(Duration::from_millis(millis), move || {
                order.lock().unwrap().push(label);
                TaskOutcome::Drop
            });
        }

        sched.run();

        assert_eq!(*order.lock().unwrap(), vec![2, 3, 1]);
    }

    #[test]
    fn running_task_cannot_be_found_by_remove_from_within_itself() {
        // Model the "self remove during own execution" scenario: a task
        // holds a `Uid` it already knows and a shared flag reporting
        // whether `remove` found it while it (the task) was the one
        // executing. Since a task cannot hold `&mut Scheduler` while its
        // closure runs (the scheduler owns `&mut self` during `run`), this
        // invariant is structural in this port rather than something a test
        // can provoke a false positive on — we instead assert the
        // documented replacement idiom (returning `Drop`) has the same
        // effect as a successful self-removal.
        let removed = Arc::new(AtomicUsize::new(0));
        let removed_clone = Arc::clone(&removed);

        let mut sched = Scheduler::new();
        sched.add(Duration::from_millis(5), move || {
            removed_clone.fetch_add(1, Ordering::SeqCst);
            TaskOutcome::Drop
        });

        sched.run();

        assert_eq!(removed.load(Ordering::SeqCst), 1);
        assert!(sched.is_empty());
    }
}
