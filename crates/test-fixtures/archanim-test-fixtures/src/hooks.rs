//! Recording hooks, tracker and redstone verifier.

use std::sync::{Arc, Mutex};

use anyhow::bail;
use archanim_animation_core::{
    Animation, AnimationHook, AnimationHookFactory, AnimationId, AnimationState, AnimationTracker,
    Animator, RedstoneVerifier, StructureActivityManager, StructureId,
};

/// One hook invocation as seen by a [`RecordingHook`].
#[derive(Clone, Debug, PartialEq)]
pub struct HookCall {
    pub hook: String,
    pub action: &'static str,
    pub steps_executed: u32,
    pub state: AnimationState,
}

pub type HookLog = Arc<Mutex<Vec<HookCall>>>;

fn push(log: &HookLog, hook: &str, action: &'static str, animation: &Animation) {
    log.lock().unwrap_or_else(|e| e.into_inner()).push(HookCall {
        hook: hook.to_string(),
        action,
        steps_executed: animation.steps_executed(),
        state: animation.state(),
    });
}

/// Appends every call to a shared log.
pub struct RecordingHook {
    name: String,
    log: HookLog,
}

impl RecordingHook {
    pub fn factory(name: &str, log: HookLog) -> Arc<dyn AnimationHookFactory> {
        let name = name.to_string();
        Arc::new(move |_: &Arc<Animation>| -> Option<Box<dyn AnimationHook>> {
            Some(Box::new(RecordingHook {
                name: name.clone(),
                log: log.clone(),
            }))
        })
    }
}

impl AnimationHook for RecordingHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_prepare(&mut self, animation: &Animation) -> anyhow::Result<()> {
        push(&self.log, &self.name, "on_prepare", animation);
        Ok(())
    }

    fn on_pre_animation_step(&mut self, animation: &Animation) -> anyhow::Result<()> {
        push(&self.log, &self.name, "on_pre_animation_step", animation);
        Ok(())
    }

    fn on_post_animation_step(&mut self, animation: &Animation) -> anyhow::Result<()> {
        push(&self.log, &self.name, "on_post_animation_step", animation);
        Ok(())
    }

    fn on_animation_ending(&mut self, animation: &Animation) -> anyhow::Result<()> {
        push(&self.log, &self.name, "on_animation_ending", animation);
        Ok(())
    }

    fn on_animation_completed(&mut self, animation: &Animation) -> anyhow::Result<()> {
        push(&self.log, &self.name, "on_animation_completed", animation);
        Ok(())
    }

    fn on_animation_aborted(&mut self, animation: &Animation) -> anyhow::Result<()> {
        push(&self.log, &self.name, "on_animation_aborted", animation);
        Ok(())
    }
}

/// Fails (or panics) on the `nth` call of `action`, and records every
/// call of that action.
pub struct FailingHook {
    name: String,
    action: &'static str,
    nth: u32,
    panic: bool,
    calls: u32,
    log: HookLog,
}

impl FailingHook {
    pub fn factory(
        name: &str,
        action: &'static str,
        nth: u32,
        panic: bool,
        log: HookLog,
    ) -> Arc<dyn AnimationHookFactory> {
        let name = name.to_string();
        Arc::new(move |_: &Arc<Animation>| -> Option<Box<dyn AnimationHook>> {
            Some(Box::new(FailingHook {
                name: name.clone(),
                action,
                nth,
                panic,
                calls: 0,
                log: log.clone(),
            }))
        })
    }

    fn call(&mut self, action: &'static str, animation: &Animation) -> anyhow::Result<()> {
        if action != self.action {
            return Ok(());
        }
        self.calls += 1;
        push(&self.log, &self.name, action, animation);
        if self.calls == self.nth {
            if self.panic {
                panic!("{} blew up in {action}", self.name);
            }
            bail!("{} failed in {action}", self.name);
        }
        Ok(())
    }
}

impl AnimationHook for FailingHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_prepare(&mut self, animation: &Animation) -> anyhow::Result<()> {
        self.call("on_prepare", animation)
    }

    fn on_pre_animation_step(&mut self, animation: &Animation) -> anyhow::Result<()> {
        self.call("on_pre_animation_step", animation)
    }

    fn on_post_animation_step(&mut self, animation: &Animation) -> anyhow::Result<()> {
        self.call("on_post_animation_step", animation)
    }

    fn on_animation_ending(&mut self, animation: &Animation) -> anyhow::Result<()> {
        self.call("on_animation_ending", animation)
    }

    fn on_animation_completed(&mut self, animation: &Animation) -> anyhow::Result<()> {
        self.call("on_animation_completed", animation)
    }

    fn on_animation_aborted(&mut self, animation: &Animation) -> anyhow::Result<()> {
        self.call("on_animation_aborted", animation)
    }
}

/// Counts finish notifications, forwarding them to an activity manager.
pub struct RecordingTracker {
    finished: Mutex<Vec<AnimationId>>,
    activity: Arc<StructureActivityManager>,
}

impl RecordingTracker {
    pub fn new(activity: Arc<StructureActivityManager>) -> Self {
        Self {
            finished: Mutex::new(Vec::new()),
            activity,
        }
    }

    pub fn finished(&self) -> Vec<AnimationId> {
        self.finished.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn finished_count(&self, id: AnimationId) -> usize {
        self.finished().iter().filter(|f| **f == id).count()
    }
}

impl AnimationTracker for RecordingTracker {
    fn process_finished_animation(&self, animator: &Animator) {
        self.finished
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(animator.id());
        self.activity.process_finished_animation(animator);
    }
}

/// Records the structures whose redstone state was re-checked.
#[derive(Default)]
pub struct RecordingVerifier {
    verified: Mutex<Vec<StructureId>>,
}

impl RecordingVerifier {
    pub fn verified(&self) -> Vec<StructureId> {
        self.verified.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl RedstoneVerifier for RecordingVerifier {
    fn verify_redstone_state(&self, structure: StructureId) -> anyhow::Result<()> {
        self.verified
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(structure);
        Ok(())
    }
}
