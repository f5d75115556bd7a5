//! archanim animation core (host-agnostic)
//!
//! Animates multi-block structures by swapping their blocks for moving
//! substitutes, stepping them along per-kind trajectories on a periodic
//! task, and placing real blocks at the destination. Hosts plug in through
//! the traits in [`world`], [`scheduler`] and [`activity`].

pub mod activity;
pub mod animation;
pub mod animator;
pub mod block;
pub mod component;
pub mod config;
pub mod error;
pub mod hooks;
pub mod ids;
pub mod manager;
pub mod position;
pub mod request;
pub mod scheduler;
pub mod structure;
pub mod world;

// Re-exports for hosts
pub use activity::{AnimationTracker, StructureActivityManager};
pub use animation::{Animation, AnimationState};
pub use animator::{apply_movement, AnimationStep, Animator, AnimatorContext};
pub use block::{AnimatedBlock, AnimatedBlockInfo};
pub use component::{
    AnimationComponent, AnimationComponentKind, ClockComponent, HorizontalAxis,
    HorizontalRotationComponent, LinearComponent, MovementMethod, VerticalRotationComponent,
};
pub use config::Config;
pub use error::AnimationError;
pub use hooks::{AnimationHook, AnimationHookFactory, AnimationHookManager, AnimationHookRegistry};
pub use ids::{AnimationId, IdAllocator, StructureId, TaskHandle};
pub use manager::{AnimatedBlockManager, BlockSubstitutionManager, PreviewBlockManager};
pub use position::{BlockPos, Cuboid, RotatedPosition};
pub use request::{AnimationRequestBuilder, AnimationRequestData};
pub use scheduler::{assert_main_thread, MainTask, RepeatingTask, Scheduler, TickScheduler};
pub use structure::{
    ActionCause, ActionType, AnimationType, MovementDirection, PlayerRef, StructureKind,
    StructureSnapshot,
};
pub use world::{
    AnimationContext, BlockCreation, BlockEntity, BlockSubstitutionFactory, FixedClock,
    PreviewBlock, PreviewBlockFactory, PreviewColor, RedstoneVerifier, WorldClock,
};
