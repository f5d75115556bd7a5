//! The animation engine.
//!
//! An [`Animator`] drives one animation from start to finish:
//!
//! 1. `start_animation` marshals to the main thread, where the block manager
//!    builds the substitutes and the [`Animation`] record is created.
//! 2. Skipped or empty animations place their blocks immediately. Otherwise
//!    the substitutes are spawned, hooks are prepared and a repeating step
//!    task is scheduled.
//! 3. Each step advances the component, then after `duration` ticks snaps
//!    every block to its final position for a few grace ticks, then stops.
//! 4. `stop_animation` (graceful) or `abort` (hard) places the final blocks
//!    exactly once and reports to the owning tracker exactly once.
//!
//! Every position change goes through [`apply_movement`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};

use log::{debug, error, trace, warn};

use crate::activity::AnimationTracker;
use crate::animation::{Animation, AnimationState};
use crate::block::AnimatedBlock;
use crate::component::{AnimationComponent, AnimationComponentKind, MovementMethod};
use crate::config::Config;
use crate::error::{panic_message, AnimationError};
use crate::hooks::{AnimationHookManager, AnimationHookRegistry};
use crate::ids::{next_animation_id, AnimationId, StructureId, TaskHandle};
use crate::manager::AnimatedBlockManager;
use crate::position::{Cuboid, RotatedPosition};
use crate::request::AnimationRequestData;
use crate::scheduler::{assert_main_thread, lock, Scheduler};
use crate::structure::AnimationType;
use crate::world::{AnimationContext, RedstoneVerifier, WorldClock};

/// Move `block` towards `target`. The only place block positions change.
pub fn apply_movement(
    block: &mut AnimatedBlock,
    target: RotatedPosition,
    method: MovementMethod,
    ticks_remaining: Option<u32>,
) -> Result<(), AnimationError> {
    let src = block.source();
    block
        .entity_mut()
        .move_to_target(&target, method, ticks_remaining)
        .map_err(|source| AnimationError::Movement {
            x: src.x,
            y: src.y,
            z: src.z,
            source,
        })?;
    block.set_current(target);
    Ok(())
}

/// The live blocks of one animation, lent to a component for one step.
#[derive(Debug)]
pub struct AnimationStep<'a> {
    blocks: &'a mut [AnimatedBlock],
    method: MovementMethod,
    ticks_remaining: Option<u32>,
}

impl<'a> AnimationStep<'a> {
    pub fn new(
        blocks: &'a mut [AnimatedBlock],
        method: MovementMethod,
        ticks_remaining: Option<u32>,
    ) -> Self {
        Self {
            blocks,
            method,
            ticks_remaining,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    #[inline]
    pub fn blocks(&self) -> &[AnimatedBlock] {
        self.blocks
    }

    /// Steps left until the end of the animation, when bounded.
    #[inline]
    pub fn ticks_remaining(&self) -> Option<u32> {
        self.ticks_remaining
    }

    #[inline]
    pub fn movement_method(&self) -> MovementMethod {
        self.method
    }

    /// Move the block at `index` to `target`.
    pub fn apply_movement(
        &mut self,
        index: usize,
        target: RotatedPosition,
    ) -> Result<(), AnimationError> {
        let len = self.blocks.len();
        let block = self
            .blocks
            .get_mut(index)
            .ok_or_else(|| AnimationError::InvalidRequest {
                reason: format!("no animated block at index {index} (of {len})"),
            })?;
        apply_movement(block, target, self.method, self.ticks_remaining)
    }

    /// Move every block to the target `f` returns for it; `None` leaves the
    /// block in place. All blocks are tried; the first failure is returned.
    pub fn move_each<F>(&mut self, mut f: F) -> Result<(), AnimationError>
    where
        F: FnMut(&AnimatedBlock) -> Option<RotatedPosition>,
    {
        let mut first_err = None;
        for block in self.blocks.iter_mut() {
            let Some(target) = f(&*block) else {
                continue;
            };
            if let Err(e) = apply_movement(block, target, self.method, self.ticks_remaining) {
                if first_err.is_none() {
                    first_err = Some(e);
                } else {
                    trace!("further movement failure: {e:#}");
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Collaborators shared by every animator of one host.
#[derive(Clone)]
pub struct AnimatorContext {
    pub scheduler: Arc<dyn Scheduler>,
    pub tracker: Arc<dyn AnimationTracker>,
    pub hooks: Arc<AnimationHookRegistry>,
    pub redstone: Option<Arc<dyn RedstoneVerifier>>,
    pub config: Config,
}

impl std::fmt::Debug for AnimatorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimatorContext")
            .field("hooks", &self.hooks)
            .field("redstone", &self.redstone.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl AnimatorContext {
    pub fn new(scheduler: Arc<dyn Scheduler>, tracker: Arc<dyn AnimationTracker>) -> Self {
        Self {
            scheduler,
            tracker,
            hooks: Arc::new(AnimationHookRegistry::new()),
            redstone: None,
            config: Config::default(),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<AnimationHookRegistry>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_redstone_verifier(mut self, verifier: Arc<dyn RedstoneVerifier>) -> Self {
        self.redstone = Some(verifier);
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }
}

/// Which branch one step took.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum StepBranch {
    Normal,
    Finishing,
    Stopped,
}

/// Drives one animation. Shared as `Arc`; scheduled work holds a `Weak`.
pub struct Animator {
    self_ref: Weak<Animator>,
    id: AnimationId,
    request: AnimationRequestData,
    component: Box<dyn AnimationComponent>,
    manager: Mutex<Box<dyn AnimatedBlockManager>>,
    ctx: AnimatorContext,
    duration: u32,
    stop_count: u32,
    animation: OnceLock<Arc<Animation>>,
    hooks: Mutex<AnimationHookManager>,
    step_counter: AtomicU32,
    task: Mutex<Option<TaskHandle>>,
    has_started: AtomicBool,
    terminated: AtomicBool,
    blocks_placed: AtomicBool,
    finished_reported: AtomicBool,
}

impl std::fmt::Debug for Animator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animator")
            .field("id", &self.id)
            .field("structure", &self.structure_id())
            .field("component", &self.component)
            .field("duration", &self.duration)
            .field("stop_count", &self.stop_count)
            .field("state", &self.animation.get().map(|a| a.state()))
            .finish()
    }
}

impl Animator {
    pub fn new(
        request: AnimationRequestData,
        component: Box<dyn AnimationComponent>,
        manager: Box<dyn AnimatedBlockManager>,
        ctx: AnimatorContext,
    ) -> Arc<Self> {
        let duration = request.duration_ticks(&ctx.config);
        let grace = if request.snapshot().kind.is_perpetual_capable() {
            0
        } else {
            ctx.config.finish_duration_ticks
        };
        Arc::new_cyclic(|weak| Self {
            self_ref: weak.clone(),
            id: next_animation_id(),
            stop_count: duration.saturating_add(grace),
            duration,
            request,
            component,
            manager: Mutex::new(manager),
            ctx,
            animation: OnceLock::new(),
            hooks: Mutex::new(AnimationHookManager::default()),
            step_counter: AtomicU32::new(0),
            task: Mutex::new(None),
            has_started: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            blocks_placed: AtomicBool::new(false),
            finished_reported: AtomicBool::new(false),
        })
    }

    /// Build an animator with the built-in component for the request's
    /// structure kind.
    pub fn for_request(
        request: AnimationRequestData,
        manager: Box<dyn AnimatedBlockManager>,
        ctx: AnimatorContext,
        clock: Option<Arc<dyn WorldClock>>,
    ) -> Result<Arc<Self>, AnimationError> {
        let component = AnimationComponentKind::for_request(&request, &ctx.config, clock)?;
        Ok(Self::new(request, Box::new(component), manager, ctx))
    }

    #[inline]
    pub fn id(&self) -> AnimationId {
        self.id
    }

    #[inline]
    pub fn structure_id(&self) -> StructureId {
        self.request.snapshot().uid
    }

    #[inline]
    pub fn request(&self) -> &AnimationRequestData {
        &self.request
    }

    #[inline]
    pub fn animation_type(&self) -> AnimationType {
        self.request.animation_type()
    }

    /// Ticks of regular stepping.
    #[inline]
    pub fn duration_ticks(&self) -> u32 {
        self.duration
    }

    /// Step count after which the animation stops.
    #[inline]
    pub fn stop_count(&self) -> u32 {
        self.stop_count
    }

    /// The animation record, once the blocks were created.
    pub fn animation(&self) -> Option<Arc<Animation>> {
        self.animation.get().cloned()
    }

    pub fn task_handle(&self) -> Option<TaskHandle> {
        *lock(&self.task)
    }

    #[inline]
    pub fn has_started(&self) -> bool {
        self.has_started.load(Ordering::Acquire)
    }

    /// Stopped, aborted, skipped or failed: no further steps will run.
    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Steps taken so far, including grace steps.
    #[inline]
    pub fn step_counter(&self) -> u32 {
        self.step_counter.load(Ordering::Acquire)
    }

    fn scheduler(&self) -> &dyn Scheduler {
        self.ctx.scheduler.as_ref()
    }

    fn hooks(&self) -> MutexGuard<'_, AnimationHookManager> {
        lock(&self.hooks)
    }

    /// Start the animation. The work happens on the main thread; called
    /// from elsewhere it is queued there.
    pub fn start_animation(&self) -> Result<(), AnimationError> {
        if self
            .has_started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            let err = AnimationError::AlreadyStarted {
                animation: self.id,
                structure: self.structure_id(),
            };
            error!("{err}");
            return Err(err);
        }
        let Some(this) = self.self_ref.upgrade() else {
            return Ok(());
        };
        self.scheduler()
            .run_on_main_thread(Box::new(move || this.start_animation0()));
        Ok(())
    }

    fn start_animation0(&self) {
        if assert_main_thread(self.scheduler(), "start_animation0").is_err() {
            return;
        }
        if self.is_terminated() {
            debug!("{} ({}): terminated before start", self.id, self.structure_id());
            return;
        }
        let snapshot = self.request.snapshot().clone();
        let context = AnimationContext {
            structure: snapshot.uid,
            kind: snapshot.kind,
            animation_type: self.request.animation_type(),
            world: snapshot.world.clone(),
        };

        if let Some(limit) = self.ctx.config.max_animated_blocks {
            let count = snapshot.cuboid.volume();
            if count > limit {
                error!(
                    "{} ({}): {}",
                    self.id,
                    self.structure_id(),
                    AnimationError::TooManyBlocks { count, limit }
                );
                self.fail_initialization();
                return;
            }
        }

        let (created, infos) = {
            let mut manager = lock(&self.manager);
            let created = manager.create_animated_blocks(
                &snapshot,
                self.component.as_ref(),
                &context,
                self.component.movement_method(),
            );
            (created, manager.block_infos())
        };
        if !created {
            self.fail_initialization();
            return;
        }
        // Aborted while the blocks were being built.
        if self.is_terminated() {
            self.restore_blocks();
            return;
        }

        let animation = Arc::new(Animation::new(
            self.id,
            self.duration,
            self.request.is_perpetual(),
            snapshot,
            Arc::from(infos),
            self.request.animation_type(),
        ));
        let animation = self.animation.get_or_init(|| animation).clone();

        if self.request.skip_animation() || animation.animated_blocks().is_empty() {
            debug!(
                "{} ({}): skipped with {} blocks",
                self.id,
                self.structure_id(),
                animation.animated_blocks().len()
            );
            animation.set_state(AnimationState::Skipped);
            self.terminated.store(true, Ordering::Release);
            self.put_blocks();
            return;
        }

        *self.hooks() = self.ctx.hooks.instantiate_hooks(&animation);

        if let Err(err) = self.prepare_animation() {
            error!(
                "{} ({}): failed to prepare, restoring blocks: {err:#}",
                self.id,
                self.structure_id()
            );
            self.terminated.store(true, Ordering::Release);
            animation.set_state(AnimationState::Stopping);
            self.restore_blocks();
            animation.set_state(AnimationState::Completed);
            self.hooks().on_animation_aborted(&animation);
            self.report_finished();
            return;
        }
        animation.set_state(AnimationState::Active);
        self.hooks().on_prepare(&animation);

        let weak = self.self_ref.clone();
        let handle = self.ctx.scheduler.run_async_repeated(
            Box::new(move || {
                if let Some(this) = weak.upgrade() {
                    this.run_step();
                }
            }),
            self.ctx.config.start_delay(),
            self.ctx.config.tick_period(),
        );
        *lock(&self.task) = Some(handle);
        debug!(
            "{} ({}): started, {} ticks, stop after {}, {handle}",
            self.id,
            self.structure_id(),
            self.duration,
            self.stop_count
        );
        // Stopped between scheduling and recording the handle.
        if self.is_terminated() {
            self.ctx.scheduler.cancel(handle);
        }
    }

    /// Spawn the substitutes and give the component its setup call.
    fn prepare_animation(&self) -> Result<(), AnimationError> {
        assert_main_thread(self.scheduler(), "prepare_animation")?;
        let mut manager = lock(&self.manager);
        manager.spawn_animated_blocks()?;
        let mut step = AnimationStep::new(
            manager.animated_blocks_mut(),
            self.component.movement_method(),
            Some(self.duration),
        );
        self.component.prepare_animation(&mut step)
    }

    fn fail_initialization(&self) {
        error!(
            "{} ({}): failed to initialize, restoring blocks",
            self.id,
            self.structure_id()
        );
        self.terminated.store(true, Ordering::Release);
        self.restore_blocks();
        self.report_finished();
    }

    fn restore_blocks(&self) {
        self.blocks_placed.store(true, Ordering::Release);
        if let Err(err) = lock(&self.manager).restore_blocks_on_failure() {
            error!("{} ({}): restore failed: {err:#}", self.id, self.structure_id());
        }
    }

    fn run_step(&self) {
        let Some(animation) = self.animation.get() else {
            return;
        };
        if self.is_terminated() {
            return;
        }
        self.hooks().on_pre_animation_step(animation);
        let counter = self.step_counter.fetch_add(1, Ordering::AcqRel) + 1;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.advance(animation, counter)));
        match outcome {
            Ok(Ok(StepBranch::Stopped)) => return,
            Ok(Ok(branch)) => trace!("{} step {counter}: {branch:?}", self.id),
            Ok(Err(err)) => warn!(
                "{} ({}): step {counter} failed: {err:#}",
                self.id,
                self.structure_id()
            ),
            Err(payload) => warn!(
                "{} ({}): {}",
                self.id,
                self.structure_id(),
                AnimationError::StepPanicked {
                    tick: counter,
                    message: panic_message(payload.as_ref()),
                }
            ),
        }
        animation.set_steps_executed(counter);
        self.hooks().on_post_animation_step(animation);
    }

    fn advance(&self, animation: &Animation, counter: u32) -> Result<StepBranch, AnimationError> {
        if self.request.is_perpetual() || counter <= self.duration {
            let remaining = (!self.request.is_perpetual()).then(|| self.duration - counter);
            let mut manager = lock(&self.manager);
            let result = {
                let mut step = AnimationStep::new(
                    manager.animated_blocks_mut(),
                    self.component.movement_method(),
                    remaining,
                );
                self.component.execute_animation_step(&mut step, counter)
            };
            update_region(animation, manager.animated_blocks());
            drop(manager);
            animation.set_state(AnimationState::Active);
            result.map(|()| StepBranch::Normal)
        } else if counter > self.stop_count {
            self.stop_animation();
            Ok(StepBranch::Stopped)
        } else {
            let mut manager = lock(&self.manager);
            let mut first_err = None;
            for block in manager.animated_blocks_mut() {
                if block.is_stationary() {
                    continue;
                }
                let target = *block.final_position();
                if let Err(e) = apply_movement(block, target, MovementMethod::Teleport, None) {
                    first_err.get_or_insert(e);
                }
            }
            update_region(animation, manager.animated_blocks());
            drop(manager);
            animation.set_state(AnimationState::Finishing);
            first_err.map_or(Ok(StepBranch::Finishing), Err)
        }
    }

    /// Finish gracefully: place the final blocks and complete.
    ///
    /// Off the main thread, placement and everything after it run on the
    /// next main-thread turn.
    pub fn stop_animation(&self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            debug!("{} ({}): already terminated", self.id, self.structure_id());
            return;
        }
        let Some(animation) = self.animation.get() else {
            self.finish_unstarted();
            return;
        };
        debug!("{} ({}): stopping", self.id, self.structure_id());
        animation.set_state(AnimationState::Stopping);
        self.hooks().on_animation_ending(animation);
        self.cancel_task();
        self.put_blocks_then(Animator::complete_stopped);
    }

    fn complete_stopped(&self) {
        let Some(animation) = self.animation.get() else {
            return;
        };
        animation.set_region(animation.snapshot().cuboid);
        animation.set_state(AnimationState::Completed);
        self.hooks().on_animation_completed(animation);
        self.schedule_redstone_verification();
    }

    /// Stop immediately: cancel stepping, then place the final blocks.
    pub fn abort(&self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            debug!("{} ({}): abort ignored, already terminated", self.id, self.structure_id());
            return;
        }
        self.cancel_task();
        let Some(animation) = self.animation.get() else {
            self.finish_unstarted();
            return;
        };
        debug!("{} ({}): aborting", self.id, self.structure_id());
        animation.set_state(AnimationState::Stopping);
        self.put_blocks_then(Animator::complete_aborted);
    }

    fn complete_aborted(&self) {
        let Some(animation) = self.animation.get() else {
            return;
        };
        animation.set_state(AnimationState::Completed);
        self.hooks().on_animation_aborted(animation);
    }

    /// Place the real blocks at their final positions. Only the first call
    /// does anything.
    pub fn put_blocks(&self) {
        self.put_blocks_then(|_| {});
    }

    /// Place the blocks, run `then`, and report to the tracker, all on the
    /// main thread. `then` runs even when the blocks were already placed.
    fn put_blocks_then(&self, then: fn(&Animator)) {
        let place = !self.blocks_placed.swap(true, Ordering::AcqRel);
        if !place {
            error!(
                "{} ({}): refusing to place blocks twice",
                self.id,
                self.structure_id()
            );
        }
        if self.scheduler().is_main_thread() {
            self.put_blocks0(place, then);
            return;
        }
        match self.self_ref.upgrade() {
            Some(this) => self
                .scheduler()
                .run_on_main_thread(Box::new(move || this.put_blocks0(place, then))),
            None => error!("{} ({}): dropped before placing blocks", self.id, self.structure_id()),
        }
    }

    fn put_blocks0(&self, place: bool, then: fn(&Animator)) {
        if assert_main_thread(self.scheduler(), "put_blocks0").is_err() {
            return;
        }
        if place {
            if let Err(err) = lock(&self.manager).handle_animation_completion() {
                error!("{} ({}): {err:#}", self.id, self.structure_id());
            }
        }
        then(self);
        if place {
            self.report_finished();
        }
    }

    /// Abort or stop before any block was created.
    fn finish_unstarted(&self) {
        self.blocks_placed.store(true, Ordering::Release);
        self.report_finished();
    }

    fn cancel_task(&self) {
        if let Some(handle) = lock(&self.task).take() {
            self.ctx.scheduler.cancel(handle);
        }
    }

    fn report_finished(&self) {
        if self.finished_reported.swap(true, Ordering::AcqRel) {
            return;
        }
        trace!("{} ({}): reporting finished", self.id, self.structure_id());
        self.ctx.tracker.process_finished_animation(self);
    }

    fn schedule_redstone_verification(&self) {
        if !self.request.animation_type().requires_write_access() {
            return;
        }
        let Some(verifier) = self.ctx.redstone.clone() else {
            return;
        };
        let uid = self.structure_id();
        self.ctx.scheduler.run_async_later(
            Box::new(move || {
                if let Err(e) = verifier.verify_redstone_state(uid) {
                    warn!("{uid}: redstone verification failed: {e:#}");
                }
            }),
            self.ctx.config.redstone_verification_delay(),
        );
    }
}

/// Recompute the region from the live block positions.
fn update_region(animation: &Animation, blocks: &[AnimatedBlock]) {
    if let Some(region) = Cuboid::bounding(blocks.iter().map(|b| &b.current_position().position)) {
        animation.set_region(region);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::BlockPos;
    use crate::world::BlockEntity;
    use nalgebra::Vector3;

    struct Dummy {
        moves: Arc<AtomicU32>,
        fail: bool,
    }

    impl BlockEntity for Dummy {
        fn spawn(&mut self) -> anyhow::Result<()> {
            Ok(())
        }

        fn kill(&mut self) -> anyhow::Result<()> {
            Ok(())
        }

        fn move_to_target(
            &mut self,
            _target: &RotatedPosition,
            _method: MovementMethod,
            _ticks_remaining: Option<u32>,
        ) -> anyhow::Result<()> {
            self.moves.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("stuck");
            }
            Ok(())
        }
    }

    fn block(x: i32, fail: bool, moves: &Arc<AtomicU32>) -> AnimatedBlock {
        let start = RotatedPosition::from_block(BlockPos::new(x, 0, 0));
        AnimatedBlock::new(
            crate::block::AnimatedBlockInfo {
                source: BlockPos::new(x, 0, 0),
                start_position: start,
                final_position: RotatedPosition::from_block(BlockPos::new(x, 3, 0)),
                radius: -1.0,
                start_angle: 0.0,
                on_edge: false,
                bottom: true,
            },
            Box::new(Dummy {
                moves: moves.clone(),
                fail,
            }),
        )
    }

    #[test]
    fn movement_updates_current_position() {
        let moves = Arc::new(AtomicU32::new(0));
        let mut b = block(1, false, &moves);
        let target = RotatedPosition::at(Vector3::new(1.0, 1.5, 0.0));
        apply_movement(&mut b, target, MovementMethod::Velocity, Some(3)).unwrap();
        assert_eq!(*b.current_position(), target);
        assert_eq!(moves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn move_each_tries_every_block() {
        let moves = Arc::new(AtomicU32::new(0));
        let mut blocks = vec![block(0, true, &moves), block(1, false, &moves), block(2, true, &moves)];
        let mut step = AnimationStep::new(&mut blocks, MovementMethod::Velocity, Some(1));
        let err = step
            .move_each(|b| Some(*b.final_position()))
            .unwrap_err();
        assert!(matches!(err, AnimationError::Movement { x: 0, .. }));
        assert_eq!(moves.load(Ordering::SeqCst), 3);
        // The failed blocks keep their old position.
        assert_eq!(blocks[0].current_position().block(), BlockPos::new(0, 0, 0));
        assert_eq!(blocks[1].current_position().block(), BlockPos::new(1, 3, 0));
    }

    #[test]
    fn step_index_out_of_range() {
        let mut blocks = Vec::new();
        let mut step = AnimationStep::new(&mut blocks, MovementMethod::Teleport, None);
        assert!(step
            .apply_movement(0, RotatedPosition::from_block(BlockPos::new(0, 0, 0)))
            .is_err());
    }
}
