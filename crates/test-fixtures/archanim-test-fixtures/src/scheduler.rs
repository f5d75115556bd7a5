use std::ops::Deref;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use archanim_animation_core::{MainTask, RepeatingTask, Scheduler, TaskHandle, TickScheduler};

use crate::world::{RecordingWorld, WorldEvent};

/// [`TickScheduler`] that journals cancellations into a [`RecordingWorld`],
/// so tests can order them against block placement.
pub struct JournalingScheduler {
    inner: TickScheduler,
    world: Arc<RecordingWorld>,
    repeated: AtomicU32,
    delayed: AtomicU32,
}

impl JournalingScheduler {
    pub fn new(world: Arc<RecordingWorld>, tick_period: Duration) -> Self {
        Self {
            inner: TickScheduler::new(tick_period),
            world,
            repeated: AtomicU32::new(0),
            delayed: AtomicU32::new(0),
        }
    }

    /// Repeating tasks scheduled so far.
    pub fn repeated_scheduled(&self) -> u32 {
        self.repeated.load(Ordering::SeqCst)
    }

    /// One-shot delayed tasks scheduled so far.
    pub fn delayed_scheduled(&self) -> u32 {
        self.delayed.load(Ordering::SeqCst)
    }
}

impl Deref for JournalingScheduler {
    type Target = TickScheduler;

    fn deref(&self) -> &TickScheduler {
        &self.inner
    }
}

impl Scheduler for JournalingScheduler {
    fn run_on_main_thread(&self, task: MainTask) {
        self.inner.run_on_main_thread(task);
    }

    fn run_async_repeated(
        &self,
        task: RepeatingTask,
        start_delay: Duration,
        period: Duration,
    ) -> TaskHandle {
        self.repeated.fetch_add(1, Ordering::SeqCst);
        self.inner.run_async_repeated(task, start_delay, period)
    }

    fn cancel(&self, handle: TaskHandle) {
        self.world.record(WorldEvent::Cancelled { handle });
        self.inner.cancel(handle);
    }

    fn run_async_later(&self, task: MainTask, delay: Duration) {
        self.delayed.fetch_add(1, Ordering::SeqCst);
        self.inner.run_async_later(task, delay);
    }

    fn is_main_thread(&self) -> bool {
        self.inner.is_main_thread()
    }
}
