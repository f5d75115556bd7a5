//! Host capability interfaces.
//!
//! The engine never talks to a game server directly. Each host version
//! implements these traits once: a factory that turns a world block into a
//! substitute entity, the entity capability itself, and a few optional
//! services (world time, redstone re-checks).

use std::fmt;

use nalgebra::Vector3;

use crate::component::MovementMethod;
use crate::ids::StructureId;
use crate::position::{BlockPos, RotatedPosition};
use crate::structure::{AnimationType, StructureKind};

/// Facts about the animation a substitute block belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationContext {
    pub structure: StructureId,
    pub kind: StructureKind,
    pub animation_type: AnimationType,
    pub world: String,
}

/// Everything a factory needs to substitute one world block.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockCreation {
    /// World block being substituted.
    pub source: BlockPos,
    pub start_position: RotatedPosition,
    pub final_position: RotatedPosition,
    pub radius: f64,
    pub start_angle: f64,
    pub bottom: bool,
    pub on_edge: bool,
    pub pivot: Vector3<f64>,
    pub context: AnimationContext,
    pub movement_method: MovementMethod,
}

/// Host entity standing in for one block while it moves.
pub trait BlockEntity: Send {
    /// Make the entity visible in the world.
    fn spawn(&mut self) -> anyhow::Result<()>;

    /// Remove the entity from the world.
    fn kill(&mut self) -> anyhow::Result<()>;

    /// Move towards `target`. `ticks_remaining` is the number of steps left
    /// to reach it when known, used by velocity-based movement.
    fn move_to_target(
        &mut self,
        target: &RotatedPosition,
        method: MovementMethod,
        ticks_remaining: Option<u32>,
    ) -> anyhow::Result<()>;

    /// Remove the real block this entity substitutes. Called once per block,
    /// non-edge blocks first (`edge_pass == false`), then edge blocks.
    fn delete_original_block(&mut self, _edge_pass: bool) -> anyhow::Result<()> {
        anyhow::bail!("entity does not substitute a world block")
    }

    /// Place the represented block into the world at `at`.
    fn place_block(&mut self, _at: BlockPos) -> anyhow::Result<()> {
        anyhow::bail!("entity cannot place world blocks")
    }
}

impl fmt::Debug for dyn BlockEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BlockEntity")
    }
}

/// Creates substitute entities for world blocks.
pub trait BlockSubstitutionFactory: Send + Sync {
    /// Returns `Ok(None)` to decline a block (air, disallowed types, ...).
    fn create(&self, creation: &BlockCreation) -> anyhow::Result<Option<Box<dyn BlockEntity>>>;
}

/// Color role of a preview marker.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PreviewColor {
    Corner,
    Edge,
    Body,
}

/// One ghost marker requested from a [`PreviewBlockFactory`].
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewBlock {
    pub source: BlockPos,
    pub start_position: RotatedPosition,
    pub final_position: RotatedPosition,
    pub color: PreviewColor,
    pub context: AnimationContext,
}

/// Spawns non-physical preview markers.
pub trait PreviewBlockFactory: Send + Sync {
    fn create_preview(&self, block: &PreviewBlock) -> anyhow::Result<Option<Box<dyn BlockEntity>>>;
}

/// Re-checks a structure's redstone input after it moved.
pub trait RedstoneVerifier: Send + Sync {
    fn verify_redstone_state(&self, structure: StructureId) -> anyhow::Result<()>;
}

/// Source of in-game time, in ticks since the start of the day (0..24000).
pub trait WorldClock: Send + Sync {
    fn world_time(&self) -> u64;
}

/// A clock that always reports the same time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FixedClock(pub u64);

impl WorldClock for FixedClock {
    fn world_time(&self) -> u64 {
        self.0
    }
}
