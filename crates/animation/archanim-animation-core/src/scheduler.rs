//! Scheduler collaborator and a deterministic tick-driven implementation.
//!
//! The engine runs in two domains: the host's main thread, which owns every
//! world mutation, and a periodic step driver. Hosts adapt their own
//! scheduler to [`Scheduler`]; [`TickScheduler`] covers hosts (and tests)
//! that pump ticks themselves.

use std::backtrace::Backtrace;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use log::{error, trace, warn};

use crate::error::{panic_message, AnimationError};
use crate::ids::{IdAllocator, TaskHandle};

pub type MainTask = Box<dyn FnOnce() + Send>;
pub type RepeatingTask = Box<dyn FnMut() + Send>;

/// Host scheduler as seen by the engine.
pub trait Scheduler: Send + Sync {
    /// Run `task` on the main thread. Implementations may run it inline when
    /// already on the main thread.
    fn run_on_main_thread(&self, task: MainTask);

    /// Run `task` every `period`, starting after `start_delay`.
    fn run_async_repeated(
        &self,
        task: RepeatingTask,
        start_delay: Duration,
        period: Duration,
    ) -> TaskHandle;

    /// Stop a repeating task. Cancelling an unknown or finished task is a no-op.
    fn cancel(&self, handle: TaskHandle);

    /// Run `task` once after `delay`.
    fn run_async_later(&self, task: MainTask, delay: Duration);

    fn is_main_thread(&self) -> bool;
}

/// Refuse a main-thread-only `action` when called from elsewhere.
///
/// A violation is a logic bug: it is logged at error level with a backtrace
/// and reported as [`AnimationError::ThreadAffinity`].
pub fn assert_main_thread(scheduler: &dyn Scheduler, action: &str) -> Result<(), AnimationError> {
    if scheduler.is_main_thread() {
        return Ok(());
    }
    let backtrace = Backtrace::force_capture();
    error!(
        "thread affinity violated: `{action}` called from thread {:?} instead of the main thread\n{backtrace}",
        thread::current().name().unwrap_or("<unnamed>")
    );
    Err(AnimationError::ThreadAffinity {
        action: action.to_string(),
    })
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Repeating {
    /// `None` while the task is running.
    task: Option<RepeatingTask>,
    next_run: u64,
    period: u64,
}

struct Delayed {
    run_at: u64,
    task: MainTask,
}

#[derive(Default)]
struct Queues {
    tick: u64,
    main: VecDeque<MainTask>,
    repeating: BTreeMap<TaskHandle, Repeating>,
    delayed: Vec<Delayed>,
}

/// Deterministic scheduler advanced by explicit [`TickScheduler::tick`] calls.
///
/// The thread that creates it is the main thread. Async work runs on the
/// ticking thread in handle order; no lock is held while a task runs, so
/// tasks may freely schedule and cancel.
pub struct TickScheduler {
    main_thread: ThreadId,
    tick_period: Duration,
    ids: IdAllocator,
    queues: Mutex<Queues>,
}

impl fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let q = lock(&self.queues);
        f.debug_struct("TickScheduler")
            .field("tick", &q.tick)
            .field("main", &q.main.len())
            .field("repeating", &q.repeating.len())
            .field("delayed", &q.delayed.len())
            .finish()
    }
}

impl TickScheduler {
    pub fn new(tick_period: Duration) -> Self {
        Self {
            main_thread: thread::current().id(),
            tick_period: tick_period.max(Duration::from_millis(1)),
            ids: IdAllocator::new(),
            queues: Mutex::new(Queues::default()),
        }
    }

    /// Ticks elapsed so far.
    pub fn current_tick(&self) -> u64 {
        lock(&self.queues).tick
    }

    pub fn is_scheduled(&self, handle: TaskHandle) -> bool {
        lock(&self.queues).repeating.contains_key(&handle)
    }

    pub fn has_pending(&self) -> bool {
        let q = lock(&self.queues);
        !q.main.is_empty() || !q.repeating.is_empty() || !q.delayed.is_empty()
    }

    /// Whole ticks covering `d`, rounded up.
    fn ticks(&self, d: Duration) -> u64 {
        let period = self.tick_period.as_nanos();
        d.as_nanos().div_ceil(period) as u64
    }

    /// Advance one tick: queued main-thread work, then due repeating tasks,
    /// then due delayed tasks.
    pub fn tick(&self) {
        let now = {
            let mut q = lock(&self.queues);
            q.tick += 1;
            q.tick
        };
        trace!("tick {now}");

        self.drain_main_queue();

        let due: Vec<TaskHandle> = lock(&self.queues)
            .repeating
            .iter()
            .filter(|(_, r)| r.next_run <= now && r.task.is_some())
            .map(|(h, _)| *h)
            .collect();
        for handle in due {
            let task = lock(&self.queues)
                .repeating
                .get_mut(&handle)
                .and_then(|r| r.task.take());
            let Some(mut task) = task else { continue };
            run_guarded(handle, || task());
            // Cancelled while running: the entry is gone and the task is dropped.
            if let Some(r) = lock(&self.queues).repeating.get_mut(&handle) {
                r.task = Some(task);
                r.next_run = now + r.period;
            }
        }

        let due: Vec<Delayed> = {
            let mut q = lock(&self.queues);
            let (due, pending) = std::mem::take(&mut q.delayed)
                .into_iter()
                .partition(|d| d.run_at <= now);
            q.delayed = pending;
            due
        };
        for delayed in due {
            run_guarded(TaskHandle(u64::MAX), delayed.task);
        }

        self.drain_main_queue();
    }

    /// Tick until nothing is scheduled or `max_ticks` ran. Returns ticks run.
    pub fn run_until_idle(&self, max_ticks: u64) -> u64 {
        let mut ran = 0;
        while ran < max_ticks && self.has_pending() {
            self.tick();
            ran += 1;
        }
        ran
    }

    /// Tick exactly `n` times.
    pub fn run_ticks(&self, n: u64) {
        for _ in 0..n {
            self.tick();
        }
    }

    fn drain_main_queue(&self) {
        loop {
            let task = lock(&self.queues).main.pop_front();
            match task {
                Some(task) => run_guarded(TaskHandle(u64::MAX), task),
                None => break,
            }
        }
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

fn run_guarded(handle: TaskHandle, task: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        warn!(
            "scheduled {handle} panicked: {}",
            panic_message(payload.as_ref())
        );
    }
}

impl Scheduler for TickScheduler {
    fn run_on_main_thread(&self, task: MainTask) {
        if self.is_main_thread() {
            task();
        } else {
            lock(&self.queues).main.push_back(task);
        }
    }

    fn run_async_repeated(
        &self,
        task: RepeatingTask,
        start_delay: Duration,
        period: Duration,
    ) -> TaskHandle {
        let handle = self.ids.alloc_task();
        let delay = self.ticks(start_delay);
        let period = self.ticks(period).max(1);
        let mut q = lock(&self.queues);
        let next_run = q.tick + delay.max(1);
        q.repeating.insert(
            handle,
            Repeating {
                task: Some(task),
                next_run,
                period,
            },
        );
        trace!("scheduled {handle}: first run at tick {next_run}, every {period} ticks");
        handle
    }

    fn cancel(&self, handle: TaskHandle) {
        if lock(&self.queues).repeating.remove(&handle).is_some() {
            trace!("cancelled {handle}");
        }
    }

    fn run_async_later(&self, task: MainTask, delay: Duration) {
        let delay = self.ticks(delay).max(1);
        let mut q = lock(&self.queues);
        let run_at = q.tick + delay;
        q.delayed.push(Delayed { run_at, task });
    }

    fn is_main_thread(&self) -> bool {
        thread::current().id() == self.main_thread
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn repeated_task_honours_delay_and_period() {
        let sched = TickScheduler::new(Duration::from_millis(50));
        let runs = Arc::new(AtomicU32::new(0));
        let r = runs.clone();
        let handle = sched.run_async_repeated(
            Box::new(move || {
                r.fetch_add(1, Ordering::SeqCst);
            }),
            Duration::from_millis(100),
            Duration::from_millis(100),
        );
        sched.run_ticks(1);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        sched.run_ticks(1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        sched.run_ticks(2);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        sched.cancel(handle);
        sched.run_ticks(4);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(!sched.is_scheduled(handle));
    }

    #[test]
    fn task_can_cancel_itself() {
        let sched = Arc::new(TickScheduler::default());
        let runs = Arc::new(AtomicU32::new(0));
        let handle_slot = Arc::new(Mutex::new(None::<TaskHandle>));
        let (s, r, slot) = (sched.clone(), runs.clone(), handle_slot.clone());
        let handle = sched.run_async_repeated(
            Box::new(move || {
                if r.fetch_add(1, Ordering::SeqCst) == 2 {
                    if let Some(h) = *lock(&slot) {
                        s.cancel(h);
                    }
                }
            }),
            Duration::ZERO,
            Duration::from_millis(50),
        );
        *lock(&handle_slot) = Some(handle);
        assert_eq!(sched.run_until_idle(10), 3);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn main_thread_work_runs_inline_on_main() {
        let sched = TickScheduler::default();
        let runs = Arc::new(AtomicU32::new(0));
        let r = runs.clone();
        sched.run_on_main_thread(Box::new(move || {
            r.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn off_thread_work_is_queued_for_the_next_tick() {
        let sched = Arc::new(TickScheduler::default());
        let runs = Arc::new(AtomicU32::new(0));
        let (s, r) = (sched.clone(), runs.clone());
        thread::spawn(move || {
            assert!(!s.is_main_thread());
            s.run_on_main_thread(Box::new(move || {
                r.fetch_add(1, Ordering::SeqCst);
            }));
        })
        .join()
        .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        sched.tick();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delayed_task_runs_once() {
        let sched = TickScheduler::default();
        let runs = Arc::new(AtomicU32::new(0));
        let r = runs.clone();
        sched.run_async_later(
            Box::new(move || {
                r.fetch_add(1, Ordering::SeqCst);
            }),
            Duration::from_millis(120),
        );
        sched.run_ticks(2);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        sched.run_ticks(5);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!sched.has_pending());
    }

    #[test]
    fn panicking_task_keeps_running() {
        let sched = TickScheduler::default();
        let runs = Arc::new(AtomicU32::new(0));
        let r = runs.clone();
        let handle = sched.run_async_repeated(
            Box::new(move || {
                r.fetch_add(1, Ordering::SeqCst);
                panic!("bad tick");
            }),
            Duration::ZERO,
            Duration::from_millis(50),
        );
        sched.run_ticks(3);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert!(sched.is_scheduled(handle));
    }

    #[test]
    fn assertion_refuses_other_threads() {
        let sched = Arc::new(TickScheduler::default());
        assert!(assert_main_thread(sched.as_ref(), "test").is_ok());
        let s = sched.clone();
        let err = thread::spawn(move || assert_main_thread(s.as_ref(), "test"))
            .join()
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, AnimationError::ThreadAffinity { .. }));
    }
}
