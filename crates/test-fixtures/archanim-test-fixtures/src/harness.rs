//! One-stop wiring of the in-memory host for animator tests.

use std::sync::{Arc, Mutex};

use archanim_animation_core::{
    AnimationHookFactory, AnimationHookRegistry, AnimationRequestData, Animator, AnimatorContext,
    BlockSubstitutionManager, Config, PreviewBlockManager, StructureActivityManager,
    StructureSnapshot,
};

use crate::hooks::{HookCall, HookLog, RecordingTracker, RecordingVerifier};
use crate::scheduler::JournalingScheduler;
use crate::world::{FakePreviewFactory, FakeSubstitutionFactory, RecordingWorld};

/// World, scheduler, tracker and hooks of one test.
///
/// The default config starts stepping on the first tick and re-checks
/// redstone one tick after completion, so tick counts in tests stay small.
pub struct Harness {
    pub world: Arc<RecordingWorld>,
    pub scheduler: Arc<JournalingScheduler>,
    pub activity: Arc<StructureActivityManager>,
    pub tracker: Arc<RecordingTracker>,
    pub verifier: Arc<RecordingVerifier>,
    pub hook_log: HookLog,
    pub config: Config,
    hooks: AnimationHookRegistry,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        let config = Config {
            start_delay_ms: 0,
            redstone_verification_delay_ms: 50,
            ..Config::default()
        };
        let world = RecordingWorld::new();
        let activity = Arc::new(StructureActivityManager::new());
        Self {
            scheduler: Arc::new(JournalingScheduler::new(world.clone(), config.tick_period())),
            tracker: Arc::new(RecordingTracker::new(activity.clone())),
            verifier: Arc::new(RecordingVerifier::default()),
            hook_log: Arc::new(Mutex::new(Vec::new())),
            hooks: AnimationHookRegistry::new(),
            activity,
            world,
            config,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn register_hook(&mut self, name: &str, factory: Arc<dyn AnimationHookFactory>) {
        self.hooks.register(name, factory);
    }

    pub fn hook_calls(&self) -> Vec<HookCall> {
        self.hook_log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn hook_actions(&self, hook: &str) -> Vec<&'static str> {
        self.hook_calls()
            .into_iter()
            .filter(|c| c.hook == hook)
            .map(|c| c.action)
            .collect()
    }

    /// Fill the structure's cuboid with stone.
    pub fn place_structure(&self, snapshot: &StructureSnapshot) {
        self.world.fill(&snapshot.cuboid, "stone");
    }

    pub fn context(&self) -> AnimatorContext {
        // Hooks registered after this call are not seen by the context.
        AnimatorContext::new(self.scheduler.clone(), self.tracker.clone())
            .with_hooks(Arc::new(self.hooks.clone()))
            .with_redstone_verifier(self.verifier.clone())
            .with_config(self.config.clone())
    }

    pub fn substitution_factory(&self) -> FakeSubstitutionFactory {
        FakeSubstitutionFactory::new(self.world.clone())
    }

    /// Animator replacing real blocks through `factory`.
    pub fn animator_with(
        &self,
        request: AnimationRequestData,
        factory: FakeSubstitutionFactory,
    ) -> Arc<Animator> {
        let manager = BlockSubstitutionManager::new(Arc::new(factory), self.scheduler.clone());
        Animator::for_request(request, Box::new(manager), self.context(), None)
            .expect("request should select a component")
    }

    pub fn animator(&self, request: AnimationRequestData) -> Arc<Animator> {
        self.animator_with(request, self.substitution_factory())
    }

    /// Animator showing ghost markers only.
    pub fn preview_animator(&self, request: AnimationRequestData) -> Arc<Animator> {
        let manager = PreviewBlockManager::new(
            Arc::new(FakePreviewFactory::new(self.world.clone())),
            self.scheduler.clone(),
        );
        Animator::for_request(request, Box::new(manager), self.context(), None)
            .expect("request should select a component")
    }

    /// Claim the structure, register the animator and start it.
    pub fn launch(&self, animator: &Arc<Animator>) {
        let uid = animator.structure_id();
        if animator.animation_type().requires_write_access() {
            assert!(self.activity.try_register_busy(uid), "{uid} is busy");
        }
        assert!(self.activity.add_animator(animator.clone()), "{uid} refused animator");
        animator.start_animation().expect("first start succeeds");
    }

    /// Tick until nothing is scheduled any more.
    pub fn run_to_completion(&self) -> u64 {
        self.scheduler.run_until_idle(10_000)
    }
}
