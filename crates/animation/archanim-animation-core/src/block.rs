//! Animated blocks: transient substitutes for world blocks.

use std::fmt;

use crate::position::{BlockPos, RotatedPosition};
use crate::world::BlockEntity;

/// Immutable kinematic description of one animated block, computed once
/// when the substitute is created.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimatedBlockInfo {
    /// World block the substitute replaced.
    pub source: BlockPos,
    pub start_position: RotatedPosition,
    pub final_position: RotatedPosition,
    /// Distance to the pivot axis; `-1` for components that do not rotate.
    pub radius: f64,
    pub start_angle: f64,
    pub on_edge: bool,
    pub bottom: bool,
}

/// A live substitute block owned by one block manager.
pub struct AnimatedBlock {
    info: AnimatedBlockInfo,
    current: RotatedPosition,
    entity: Box<dyn BlockEntity>,
}

impl fmt::Debug for AnimatedBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimatedBlock")
            .field("source", &self.info.source)
            .field("current", &self.current.position)
            .finish()
    }
}

impl AnimatedBlock {
    pub fn new(info: AnimatedBlockInfo, entity: Box<dyn BlockEntity>) -> Self {
        Self {
            current: info.start_position,
            info,
            entity,
        }
    }

    #[inline]
    pub fn info(&self) -> &AnimatedBlockInfo {
        &self.info
    }

    #[inline]
    pub fn source(&self) -> BlockPos {
        self.info.source
    }

    #[inline]
    pub fn start_position(&self) -> &RotatedPosition {
        &self.info.start_position
    }

    #[inline]
    pub fn final_position(&self) -> &RotatedPosition {
        &self.info.final_position
    }

    /// Position of the latest movement target.
    #[inline]
    pub fn current_position(&self) -> &RotatedPosition {
        &self.current
    }

    #[inline]
    pub fn radius(&self) -> f64 {
        self.info.radius
    }

    #[inline]
    pub fn start_angle(&self) -> f64 {
        self.info.start_angle
    }

    #[inline]
    pub fn is_on_edge(&self) -> bool {
        self.info.on_edge
    }

    #[inline]
    pub fn is_bottom(&self) -> bool {
        self.info.bottom
    }

    /// Sits on the pivot axis of a rotating component and never moves.
    #[inline]
    pub fn is_stationary(&self) -> bool {
        self.info.radius == 0.0
    }

    pub(crate) fn entity_mut(&mut self) -> &mut dyn BlockEntity {
        self.entity.as_mut()
    }

    pub(crate) fn set_current(&mut self, position: RotatedPosition) {
        self.current = position;
    }
}
