//! Owners of the live animated blocks of one animation.
//!
//! A manager materializes substitutes for the blocks of a structure, hands
//! them to the animator for stepping, and at the end either puts real
//! blocks back at the final positions or undoes the animation.

mod preview;
mod world;

use std::panic::{self, AssertUnwindSafe};

use crate::block::{AnimatedBlock, AnimatedBlockInfo};
use crate::component::{AnimationComponent, MovementMethod};
use crate::error::{panic_message, AnimationError};
use crate::position::{BlockPos, Cuboid};
use crate::structure::StructureSnapshot;
use crate::world::AnimationContext;

pub use preview::PreviewBlockManager;
pub use world::BlockSubstitutionManager;

/// Lifecycle of the substitute blocks of a single animation.
///
/// The mutating operations are main-thread only and refuse to run
/// elsewhere. Completion and restore always leave the manager empty, so a
/// second call is a no-op.
pub trait AnimatedBlockManager: Send {
    /// Create one substitute per block of `snapshot`'s cuboid.
    ///
    /// Returns `false` when creation failed part way; blocks created up to
    /// that point are kept so they can be restored.
    fn create_animated_blocks(
        &mut self,
        snapshot: &StructureSnapshot,
        component: &dyn AnimationComponent,
        context: &AnimationContext,
        movement: MovementMethod,
    ) -> bool;

    /// Spawn every substitute entity.
    fn spawn_animated_blocks(&mut self) -> Result<(), AnimationError>;

    /// Undo the animation: kill the substitutes and place real blocks back
    /// at their start positions.
    fn restore_blocks_on_failure(&mut self) -> Result<(), AnimationError>;

    /// Kill the substitutes and place real blocks at their final positions.
    fn handle_animation_completion(&mut self) -> Result<(), AnimationError>;

    fn animated_blocks(&self) -> &[AnimatedBlock];

    fn animated_blocks_mut(&mut self) -> &mut [AnimatedBlock];

    fn is_empty(&self) -> bool {
        self.animated_blocks().is_empty()
    }

    /// Immutable descriptions of the live blocks.
    fn block_infos(&self) -> Vec<AnimatedBlockInfo> {
        self.animated_blocks()
            .iter()
            .map(|b| b.info().clone())
            .collect()
    }
}

/// Kinematic description of the block at `pos`, as seen by `component`.
pub(crate) fn describe_block(
    cuboid: &Cuboid,
    pos: BlockPos,
    component: &dyn AnimationComponent,
) -> AnimatedBlockInfo {
    AnimatedBlockInfo {
        source: pos,
        start_position: component.start_position(pos.x, pos.y, pos.z),
        final_position: component.final_position(pos.x, pos.y, pos.z),
        radius: component.radius(pos.x, pos.y, pos.z),
        start_angle: component.start_angle(pos.x, pos.y, pos.z),
        on_edge: cuboid.is_on_edge(pos),
        bottom: cuboid.is_bottom(pos),
    }
}

/// Run a host factory call, turning a panic into an error.
pub(crate) fn call_factory<T>(f: impl FnOnce() -> anyhow::Result<T>) -> anyhow::Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(anyhow::anyhow!("factory panicked: {}", panic_message(payload.as_ref()))))
}
