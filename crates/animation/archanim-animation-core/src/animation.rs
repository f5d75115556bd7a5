//! State record of one in-flight animation.
//!
//! An [`Animation`] is shared between the animator that drives it, the hooks
//! bound to it and any observer querying its region. Everything that changes
//! while the animation runs sits behind interior mutability; everything else
//! is fixed at construction.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use log::{error, trace};
use serde::{Deserialize, Serialize};

use crate::block::AnimatedBlockInfo;
use crate::ids::{AnimationId, StructureId};
use crate::position::Cuboid;
use crate::scheduler::lock;
use crate::structure::{AnimationType, StructureKind, StructureSnapshot};

/// Lifecycle of an animation.
///
/// `Pending → Active → Finishing → Stopping → Completed`, or
/// `Pending → Skipped`. States never move backwards.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AnimationState {
    Pending,
    Active,
    Finishing,
    Stopping,
    Completed,
    Skipped,
}

impl AnimationState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Finishing => "finishing",
            Self::Stopping => "stopping",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Active => 1,
            Self::Finishing => 2,
            Self::Stopping => 3,
            Self::Completed => 4,
            Self::Skipped => 5,
        }
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    /// Staying in the same state is allowed.
    pub fn can_transition_to(&self, next: AnimationState) -> bool {
        match (self, next) {
            (a, b) if *a == b => true,
            (Self::Pending, _) => true,
            (Self::Skipped, _) | (_, Self::Skipped) => false,
            (a, b) => b.rank() > a.rank(),
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

/// One in-flight animation.
#[derive(Debug)]
pub struct Animation {
    id: AnimationId,
    duration: u32,
    perpetual: bool,
    region: RwLock<Cuboid>,
    state: Mutex<Vec<AnimationState>>,
    steps_executed: AtomicU32,
    animated_blocks: Arc<[AnimatedBlockInfo]>,
    snapshot: Arc<StructureSnapshot>,
    animation_type: AnimationType,
}

impl Animation {
    pub fn new(
        id: AnimationId,
        duration: u32,
        perpetual: bool,
        snapshot: Arc<StructureSnapshot>,
        animated_blocks: Arc<[AnimatedBlockInfo]>,
        animation_type: AnimationType,
    ) -> Self {
        Self {
            id,
            duration,
            perpetual,
            region: RwLock::new(snapshot.cuboid),
            state: Mutex::new(vec![AnimationState::Pending]),
            steps_executed: AtomicU32::new(0),
            animated_blocks,
            snapshot,
            animation_type,
        }
    }

    #[inline]
    pub fn id(&self) -> AnimationId {
        self.id
    }

    #[inline]
    pub fn structure_id(&self) -> StructureId {
        self.snapshot.uid
    }

    /// Duration in ticks.
    #[inline]
    pub fn duration(&self) -> u32 {
        self.duration
    }

    #[inline]
    pub fn is_perpetual(&self) -> bool {
        self.perpetual
    }

    #[inline]
    pub fn snapshot(&self) -> &Arc<StructureSnapshot> {
        &self.snapshot
    }

    #[inline]
    pub fn structure_kind(&self) -> StructureKind {
        self.snapshot.kind
    }

    #[inline]
    pub fn animation_type(&self) -> AnimationType {
        self.animation_type
    }

    #[inline]
    pub fn animated_blocks(&self) -> &Arc<[AnimatedBlockInfo]> {
        &self.animated_blocks
    }

    /// Bounding region of all live animated blocks.
    pub fn region(&self) -> Cuboid {
        *self.region.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub(crate) fn set_region(&self, region: Cuboid) {
        *self.region.write().unwrap_or_else(std::sync::PoisonError::into_inner) = region;
    }

    pub fn state(&self) -> AnimationState {
        lock(&self.state)
            .last()
            .copied()
            .unwrap_or(AnimationState::Pending)
    }

    /// Every distinct state the animation went through, in order.
    pub fn state_history(&self) -> Vec<AnimationState> {
        lock(&self.state).clone()
    }

    /// Move to `next`. Regressions are refused and logged; returns whether
    /// the state is `next` afterwards.
    pub(crate) fn set_state(&self, next: AnimationState) -> bool {
        let mut history = lock(&self.state);
        let current = history.last().copied().unwrap_or(AnimationState::Pending);
        if current == next {
            return true;
        }
        if !current.can_transition_to(next) {
            error!(
                "{} refused state regression {} -> {}",
                self.id,
                current.name(),
                next.name()
            );
            return false;
        }
        trace!("{} state {} -> {}", self.id, current.name(), next.name());
        history.push(next);
        true
    }

    #[inline]
    pub fn steps_executed(&self) -> u32 {
        self.steps_executed.load(Ordering::Acquire)
    }

    pub(crate) fn set_steps_executed(&self, steps: u32) {
        self.steps_executed.store(steps, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::BlockPos;
    use crate::structure::MovementDirection;
    use AnimationState::*;

    fn animation() -> Animation {
        let snapshot = StructureSnapshot {
            uid: StructureId(9),
            name: "a".into(),
            kind: StructureKind::Portcullis,
            world: "world".into(),
            cuboid: Cuboid::new(BlockPos::new(0, 0, 0), BlockPos::new(1, 1, 1)),
            rotation_point: BlockPos::new(0, 0, 0),
            power_block: BlockPos::new(0, -1, 0),
            is_open: false,
            open_direction: MovementDirection::Up,
            blocks_to_move: 2,
            quarter_circles: 1,
        };
        Animation::new(
            AnimationId(1),
            20,
            false,
            Arc::new(snapshot),
            Arc::from(Vec::new()),
            AnimationType::MoveBlocks,
        )
    }

    #[test]
    fn forward_transitions_only() {
        assert!(Pending.can_transition_to(Active));
        assert!(Pending.can_transition_to(Skipped));
        assert!(Active.can_transition_to(Stopping));
        assert!(Finishing.can_transition_to(Completed));
        assert!(!Finishing.can_transition_to(Active));
        assert!(!Active.can_transition_to(Skipped));
        assert!(!Skipped.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Stopping));
    }

    #[test]
    fn history_records_distinct_states() {
        let a = animation();
        assert!(a.set_state(Active));
        assert!(a.set_state(Active));
        assert!(a.set_state(Finishing));
        assert!(!a.set_state(Active));
        assert_eq!(a.state(), Finishing);
        assert_eq!(a.state_history(), vec![Pending, Active, Finishing]);
    }

    #[test]
    fn region_starts_at_snapshot() {
        let a = animation();
        assert_eq!(a.region(), a.snapshot().cuboid);
        let moved = Cuboid::new(BlockPos::new(0, 2, 0), BlockPos::new(1, 3, 1));
        a.set_region(moved);
        assert_eq!(a.region(), moved);
    }
}
