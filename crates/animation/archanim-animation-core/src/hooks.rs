//! Extension points invoked at fixed points of an animation's lifecycle.
//!
//! Hooks are built fresh for every animation by named factories. Each call
//! site runs every hook in registration order; a hook that fails or panics
//! is logged and skipped, never taking the animation or the other hooks
//! down with it.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, warn};

use crate::animation::Animation;
use crate::error::{panic_message, AnimationError};

/// Callbacks bound to one animation.
///
/// Call order: `on_prepare`, then per step `on_pre_animation_step` and
/// `on_post_animation_step`, then either `on_animation_ending` followed by
/// `on_animation_completed`, or `on_animation_aborted`.
pub trait AnimationHook: Send {
    fn name(&self) -> &str;

    fn on_prepare(&mut self, _animation: &Animation) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_pre_animation_step(&mut self, _animation: &Animation) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_post_animation_step(&mut self, _animation: &Animation) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_animation_ending(&mut self, _animation: &Animation) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_animation_completed(&mut self, _animation: &Animation) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_animation_aborted(&mut self, _animation: &Animation) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Builds a hook for an animation, or declines with `None`.
pub trait AnimationHookFactory: Send + Sync {
    fn new_hook(&self, animation: &Arc<Animation>) -> Option<Box<dyn AnimationHook>>;
}

impl<F> AnimationHookFactory for F
where
    F: Fn(&Arc<Animation>) -> Option<Box<dyn AnimationHook>> + Send + Sync,
{
    fn new_hook(&self, animation: &Arc<Animation>) -> Option<Box<dyn AnimationHook>> {
        self(animation)
    }
}

/// Named hook factories, kept in registration order.
#[derive(Clone, Default)]
pub struct AnimationHookRegistry {
    factories: IndexMap<String, Arc<dyn AnimationHookFactory>>,
}

impl fmt::Debug for AnimationHookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

impl AnimationHookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`. A factory already registered under
    /// that name is replaced in place.
    pub fn register(&mut self, name: impl Into<String>, factory: Arc<dyn AnimationHookFactory>) {
        let name = name.into();
        if self.factories.insert(name.clone(), factory).is_some() {
            warn!("hook factory `{name}` registered twice; replacing the earlier one");
        }
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.factories.shift_remove(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Build the hooks for `animation`. A factory that panics is logged and
    /// contributes no hook.
    pub fn instantiate_hooks(&self, animation: &Arc<Animation>) -> AnimationHookManager {
        let mut hooks = Vec::with_capacity(self.factories.len());
        for (name, factory) in &self.factories {
            match panic::catch_unwind(AssertUnwindSafe(|| factory.new_hook(animation))) {
                Ok(Some(hook)) => hooks.push(hook),
                Ok(None) => debug!("{}: hook factory `{name}` declined", animation.id()),
                Err(payload) => warn!(
                    "{} ({}): hook factory `{name}` panicked: {}",
                    animation.id(),
                    animation.structure_id(),
                    panic_message(payload.as_ref())
                ),
            }
        }
        AnimationHookManager { hooks }
    }
}

/// The hooks of one animation, dispatched together.
#[derive(Default)]
pub struct AnimationHookManager {
    hooks: Vec<Box<dyn AnimationHook>>,
}

impl fmt::Debug for AnimationHookManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| h.name().to_string()))
            .finish()
    }
}

impl AnimationHookManager {
    pub fn new(hooks: Vec<Box<dyn AnimationHook>>) -> Self {
        Self { hooks }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run `call` on every hook. Returns the failures, which have already
    /// been logged.
    fn dispatch(
        &mut self,
        animation: &Animation,
        action: &'static str,
        call: impl Fn(&mut dyn AnimationHook, &Animation) -> anyhow::Result<()>,
    ) -> Vec<AnimationError> {
        let mut failures = Vec::new();
        for hook in &mut self.hooks {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(hook.as_mut(), animation)));
            let reason = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => format!("{e:#}"),
                Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
            };
            let err = AnimationError::Hook {
                hook: hook.name().to_string(),
                action,
                reason,
            };
            warn!("{} ({}): {err}", animation.id(), animation.structure_id());
            failures.push(err);
        }
        failures
    }

    pub fn on_prepare(&mut self, animation: &Animation) -> Vec<AnimationError> {
        self.dispatch(animation, "on_prepare", |h, a| h.on_prepare(a))
    }

    pub fn on_pre_animation_step(&mut self, animation: &Animation) -> Vec<AnimationError> {
        self.dispatch(animation, "on_pre_animation_step", |h, a| {
            h.on_pre_animation_step(a)
        })
    }

    pub fn on_post_animation_step(&mut self, animation: &Animation) -> Vec<AnimationError> {
        self.dispatch(animation, "on_post_animation_step", |h, a| {
            h.on_post_animation_step(a)
        })
    }

    pub fn on_animation_ending(&mut self, animation: &Animation) -> Vec<AnimationError> {
        self.dispatch(animation, "on_animation_ending", |h, a| {
            h.on_animation_ending(a)
        })
    }

    pub fn on_animation_completed(&mut self, animation: &Animation) -> Vec<AnimationError> {
        self.dispatch(animation, "on_animation_completed", |h, a| {
            h.on_animation_completed(a)
        })
    }

    pub fn on_animation_aborted(&mut self, animation: &Animation) -> Vec<AnimationError> {
        self.dispatch(animation, "on_animation_aborted", |h, a| {
            h.on_animation_aborted(a)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{AnimationId, StructureId};
    use crate::position::{BlockPos, Cuboid};
    use crate::structure::{AnimationType, MovementDirection, StructureKind, StructureSnapshot};
    use std::sync::Mutex;

    struct Probe {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl AnimationHook for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn on_prepare(&mut self, _animation: &Animation) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(self.name.to_string());
            if self.fail {
                anyhow::bail!("probe failure");
            }
            Ok(())
        }

        fn on_animation_aborted(&mut self, _animation: &Animation) -> anyhow::Result<()> {
            panic!("abort probe");
        }
    }

    fn animation() -> Arc<Animation> {
        let snapshot = StructureSnapshot {
            uid: StructureId(1),
            name: "h".into(),
            kind: StructureKind::SlidingDoor,
            world: "world".into(),
            cuboid: Cuboid::new(BlockPos::new(0, 0, 0), BlockPos::new(0, 0, 0)),
            rotation_point: BlockPos::new(0, 0, 0),
            power_block: BlockPos::new(0, -1, 0),
            is_open: false,
            open_direction: MovementDirection::East,
            blocks_to_move: 1,
            quarter_circles: 1,
        };
        Arc::new(Animation::new(
            AnimationId(4),
            10,
            false,
            Arc::new(snapshot),
            Arc::from(Vec::new()),
            AnimationType::MoveBlocks,
        ))
    }

    fn registry(log: &Arc<Mutex<Vec<String>>>, names: &[(&'static str, bool)]) -> AnimationHookRegistry {
        let mut reg = AnimationHookRegistry::new();
        for &(name, fail) in names {
            let log = log.clone();
            reg.register(
                name,
                Arc::new(move |_: &Arc<Animation>| -> Option<Box<dyn AnimationHook>> {
                    Some(Box::new(Probe {
                        name,
                        log: log.clone(),
                        fail,
                    }))
                }),
            );
        }
        reg
    }

    #[test]
    fn failing_hook_does_not_stop_the_others() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reg = registry(&log, &[("a", false), ("b", true), ("c", false)]);
        let anim = animation();
        let mut hooks = reg.instantiate_hooks(&anim);
        let failures = hooks.on_prepare(&anim);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            &failures[0],
            AnimationError::Hook { hook, action: "on_prepare", .. } if hook == "b"
        ));
    }

    #[test]
    fn panicking_hooks_are_isolated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reg = registry(&log, &[("a", false), ("b", false)]);
        let anim = animation();
        let mut hooks = reg.instantiate_hooks(&anim);
        let failures = hooks.on_animation_aborted(&anim);
        assert_eq!(failures.len(), 2);
        assert!(failures[0].to_string().contains("abort probe"));
    }

    #[test]
    fn reregistering_keeps_position() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut reg = registry(&log, &[("a", false), ("b", false)]);
        reg.register(
            "a",
            Arc::new(|_: &Arc<Animation>| -> Option<Box<dyn AnimationHook>> { None }),
        );
        assert_eq!(reg.names().collect::<Vec<_>>(), vec!["a", "b"]);
        let anim = animation();
        assert_eq!(reg.instantiate_hooks(&anim).len(), 1);
        assert!(reg.unregister("b"));
        assert_eq!(reg.len(), 1);
    }
}
