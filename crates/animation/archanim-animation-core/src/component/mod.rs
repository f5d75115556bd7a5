//! Animation components: per-structure-kind trajectory strategies.
//!
//! A component answers where each block starts, where it ends, and how far
//! along its path it is after `n` ticks. It is shared read-only by every
//! block and every step of one animation.

mod clock;
mod linear;
mod rotation;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::animator::AnimationStep;
use crate::config::Config;
use crate::error::AnimationError;
use crate::position::{BlockPos, RotatedPosition};
use crate::request::AnimationRequestData;
use crate::structure::{MovementDirection, StructureKind};
use crate::world::{FixedClock, WorldClock};

pub use clock::ClockComponent;
pub use linear::LinearComponent;
pub use rotation::{HorizontalAxis, HorizontalRotationComponent, VerticalRotationComponent};

/// How a position delta is realized on the host entity.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementMethod {
    /// Jump straight to the target.
    Teleport,
    /// Interpolate towards the target over the remaining ticks.
    #[default]
    Velocity,
}

/// Geometry and per-step movement of one structure kind.
pub trait AnimationComponent: Send + Sync + std::fmt::Debug {
    /// Final position and rotation of the block originally at (x, y, z).
    fn final_position(&self, x: i32, y: i32, z: i32) -> RotatedPosition;

    fn start_position(&self, x: i32, y: i32, z: i32) -> RotatedPosition {
        RotatedPosition::from_block(BlockPos::new(x, y, z))
    }

    /// Distance to the pivot axis. `-1` means the component does not rotate.
    fn radius(&self, _x: i32, _y: i32, _z: i32) -> f64 {
        -1.0
    }

    fn start_angle(&self, _x: i32, _y: i32, _z: i32) -> f64 {
        0.0
    }

    /// Called once after the substitutes were spawned, before the first step.
    fn prepare_animation(&self, _step: &mut AnimationStep<'_>) -> Result<(), AnimationError> {
        Ok(())
    }

    /// Move every block to where it belongs after `ticks` steps.
    fn execute_animation_step(
        &self,
        step: &mut AnimationStep<'_>,
        ticks: u32,
    ) -> Result<(), AnimationError>;

    fn movement_method(&self) -> MovementMethod {
        MovementMethod::Velocity
    }
}

/// The closed set of built-in components.
#[derive(Clone, Debug)]
pub enum AnimationComponentKind {
    Linear(LinearComponent),
    HorizontalRotation(HorizontalRotationComponent),
    VerticalRotation(VerticalRotationComponent),
    ClockHands(ClockComponent),
    Revolving(HorizontalRotationComponent),
}

macro_rules! dispatch {
    ($self:ident, $c:ident => $body:expr) => {
        match $self {
            AnimationComponentKind::Linear($c) => $body,
            AnimationComponentKind::HorizontalRotation($c) => $body,
            AnimationComponentKind::VerticalRotation($c) => $body,
            AnimationComponentKind::ClockHands($c) => $body,
            AnimationComponentKind::Revolving($c) => $body,
        }
    };
}

impl AnimationComponentKind {
    /// Select the component for the structure kind of `request`.
    ///
    /// `clock` drives clock hands; without one the hands stay at noon.
    pub fn for_request(
        request: &AnimationRequestData,
        cfg: &Config,
        clock: Option<Arc<dyn WorldClock>>,
    ) -> Result<Self, AnimationError> {
        let snapshot = request.snapshot();
        let duration = request.duration_ticks(cfg);
        let direction = snapshot.current_direction();
        let pivot = snapshot.rotation_point;

        let kind = match snapshot.kind {
            StructureKind::SlidingDoor | StructureKind::Portcullis => {
                let unit = direction.unit().ok_or_else(|| invalid_direction(snapshot.kind, direction))?;
                Self::Linear(LinearComponent::new(unit, snapshot.blocks_to_move, duration))
            }
            StructureKind::BigDoor => Self::HorizontalRotation(HorizontalRotationComponent::new(
                pivot,
                rotation_sign(snapshot.kind, direction)?,
                1,
                duration,
            )),
            StructureKind::RevolvingDoor => Self::Revolving(HorizontalRotationComponent::new(
                pivot,
                rotation_sign(snapshot.kind, direction)?,
                snapshot.quarter_circles.max(1),
                duration,
            )),
            StructureKind::Drawbridge | StructureKind::Windmill => {
                let (axis, sign) = VerticalRotationComponent::axis_for(direction)
                    .ok_or_else(|| invalid_direction(snapshot.kind, direction))?;
                let mut c = VerticalRotationComponent::new(pivot, axis, sign, duration);
                if request.is_perpetual() {
                    c = c.perpetual();
                }
                Self::VerticalRotation(c)
            }
            StructureKind::Clock => {
                let clock = clock.unwrap_or_else(|| Arc::new(FixedClock(6000)));
                Self::ClockHands(ClockComponent::new(snapshot.cuboid, pivot, clock)?)
            }
        };
        Ok(kind)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear(_) => "linear",
            Self::HorizontalRotation(_) => "horizontal_rotation",
            Self::VerticalRotation(_) => "vertical_rotation",
            Self::ClockHands(_) => "clock_hands",
            Self::Revolving(_) => "revolving",
        }
    }
}

fn invalid_direction(kind: StructureKind, direction: MovementDirection) -> AnimationError {
    AnimationError::InvalidRequest {
        reason: format!("{} cannot move {direction:?}", kind.name()),
    }
}

fn rotation_sign(kind: StructureKind, direction: MovementDirection) -> Result<f64, AnimationError> {
    match direction {
        MovementDirection::Clockwise => Ok(1.0),
        MovementDirection::Counterclockwise => Ok(-1.0),
        other => Err(invalid_direction(kind, other)),
    }
}

impl AnimationComponent for AnimationComponentKind {
    fn final_position(&self, x: i32, y: i32, z: i32) -> RotatedPosition {
        dispatch!(self, c => c.final_position(x, y, z))
    }

    fn start_position(&self, x: i32, y: i32, z: i32) -> RotatedPosition {
        dispatch!(self, c => c.start_position(x, y, z))
    }

    fn radius(&self, x: i32, y: i32, z: i32) -> f64 {
        dispatch!(self, c => c.radius(x, y, z))
    }

    fn start_angle(&self, x: i32, y: i32, z: i32) -> f64 {
        dispatch!(self, c => c.start_angle(x, y, z))
    }

    fn prepare_animation(&self, step: &mut AnimationStep<'_>) -> Result<(), AnimationError> {
        dispatch!(self, c => c.prepare_animation(step))
    }

    fn execute_animation_step(
        &self,
        step: &mut AnimationStep<'_>,
        ticks: u32,
    ) -> Result<(), AnimationError> {
        dispatch!(self, c => c.execute_animation_step(step, ticks))
    }

    fn movement_method(&self) -> MovementMethod {
        dispatch!(self, c => c.movement_method())
    }
}

/// Fraction of the animation completed after `ticks`, clamped to [0, 1].
#[inline]
pub(crate) fn progress(ticks: u32, duration: u32) -> f64 {
    if duration == 0 {
        return 1.0;
    }
    (ticks.min(duration) as f64) / duration as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::StructureId;
    use crate::position::Cuboid;
    use crate::structure::StructureSnapshot;

    fn snapshot(kind: StructureKind, dir: MovementDirection) -> StructureSnapshot {
        StructureSnapshot {
            uid: StructureId(3),
            name: "s".into(),
            kind,
            world: "world".into(),
            cuboid: Cuboid::new(BlockPos::new(0, 0, 0), BlockPos::new(1, 3, 3)),
            rotation_point: BlockPos::new(0, 0, 0),
            power_block: BlockPos::new(0, -1, 0),
            is_open: false,
            open_direction: dir,
            blocks_to_move: 4,
            quarter_circles: 3,
        }
    }

    fn select(kind: StructureKind, dir: MovementDirection) -> Result<AnimationComponentKind, AnimationError> {
        let req = AnimationRequestData::builder(snapshot(kind, dir)).build()?;
        AnimationComponentKind::for_request(&req, &Config::default(), None)
    }

    #[test]
    fn selection_per_kind() {
        assert_eq!(select(StructureKind::SlidingDoor, MovementDirection::East).unwrap().name(), "linear");
        assert_eq!(select(StructureKind::Portcullis, MovementDirection::Up).unwrap().name(), "linear");
        assert_eq!(
            select(StructureKind::BigDoor, MovementDirection::Clockwise).unwrap().name(),
            "horizontal_rotation"
        );
        assert_eq!(
            select(StructureKind::RevolvingDoor, MovementDirection::Counterclockwise).unwrap().name(),
            "revolving"
        );
        assert_eq!(
            select(StructureKind::Drawbridge, MovementDirection::North).unwrap().name(),
            "vertical_rotation"
        );
        assert_eq!(select(StructureKind::Clock, MovementDirection::North).unwrap().name(), "clock_hands");
    }

    #[test]
    fn rejects_impossible_directions() {
        assert!(select(StructureKind::BigDoor, MovementDirection::North).is_err());
        assert!(select(StructureKind::SlidingDoor, MovementDirection::Clockwise).is_err());
        assert!(select(StructureKind::Drawbridge, MovementDirection::Up).is_err());
    }

    #[test]
    fn progress_clamps() {
        assert_eq!(progress(0, 10), 0.0);
        assert_eq!(progress(5, 10), 0.5);
        assert_eq!(progress(15, 10), 1.0);
        assert_eq!(progress(3, 0), 1.0);
    }
}
