use std::f64::consts::TAU;
use std::fmt;
use std::sync::Arc;

use super::rotation::HorizontalAxis;
use super::{AnimationComponent, MovementMethod};
use crate::animator::AnimationStep;
use crate::error::AnimationError;
use crate::position::{BlockPos, Cuboid, RotatedPosition};
use crate::world::WorldClock;

/// Ticks in one in-game hour.
const TICKS_PER_HOUR: u64 = 1000;
/// The hour hand turns twice per in-game day.
const TICKS_PER_HALF_DAY: u64 = 12_000;
/// World time 0 is 06:00.
const DAY_START_OFFSET: u64 = 6000;

/// Two-layer clock face. The layer on the low side of the axis carries the
/// hour hand, the other the minute hand; both are built pointing at twelve.
#[derive(Clone)]
pub struct ClockComponent {
    pivot: BlockPos,
    axis: HorizontalAxis,
    hour_layer: i32,
    clock: Arc<dyn WorldClock>,
}

impl fmt::Debug for ClockComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClockComponent")
            .field("pivot", &self.pivot)
            .field("axis", &self.axis)
            .field("hour_layer", &self.hour_layer)
            .finish()
    }
}

impl ClockComponent {
    /// The face must be exactly two blocks thick along X or Z.
    pub fn new(
        cuboid: Cuboid,
        pivot: BlockPos,
        clock: Arc<dyn WorldClock>,
    ) -> Result<Self, AnimationError> {
        let (dx, _, dz) = cuboid.dimensions();
        let axis = match (dx, dz) {
            (2, _) => HorizontalAxis::X,
            (_, 2) => HorizontalAxis::Z,
            _ => {
                return Err(AnimationError::InvalidRequest {
                    reason: format!("clock must be two blocks thick, got {dx}x{dz}"),
                })
            }
        };
        let hour_layer = match axis {
            HorizontalAxis::X => cuboid.min().x,
            HorizontalAxis::Z => cuboid.min().z,
        };
        Ok(Self {
            pivot,
            axis,
            hour_layer,
            clock,
        })
    }

    /// Hand angles (hour, minute) for `time`, clockwise from twelve.
    pub fn hand_angles(time: u64) -> (f64, f64) {
        let hour = ((time + DAY_START_OFFSET) % TICKS_PER_HALF_DAY) as f64 / TICKS_PER_HALF_DAY as f64;
        let minute = (time % TICKS_PER_HOUR) as f64 / TICKS_PER_HOUR as f64;
        (-hour * TAU, -minute * TAU)
    }

    fn is_hour_hand(&self, along: f64) -> bool {
        along.round() as i32 == self.hour_layer
    }
}

impl AnimationComponent for ClockComponent {
    /// The face keeps its layout; stopping resets the hands.
    fn final_position(&self, x: i32, y: i32, z: i32) -> RotatedPosition {
        self.start_position(x, y, z)
    }

    fn radius(&self, x: i32, y: i32, z: i32) -> f64 {
        let (h, v) = self
            .axis
            .plane(x - self.pivot.x, y - self.pivot.y, z - self.pivot.z);
        (h as f64).hypot(v as f64)
    }

    fn start_angle(&self, x: i32, y: i32, z: i32) -> f64 {
        let (h, v) = self
            .axis
            .plane(x - self.pivot.x, y - self.pivot.y, z - self.pivot.z);
        (v as f64).atan2(h as f64)
    }

    fn execute_animation_step(
        &self,
        step: &mut AnimationStep<'_>,
        _ticks: u32,
    ) -> Result<(), AnimationError> {
        let (hour, minute) = Self::hand_angles(self.clock.world_time());
        let (ph, pv) = self.axis.plane(self.pivot.x, self.pivot.y, self.pivot.z);
        let (ph, pv) = (ph as f64, pv as f64);
        step.move_each(|block| {
            if block.is_stationary() {
                return None;
            }
            let along = self.axis.along(&block.start_position().position);
            let delta = if self.is_hour_hand(along) { hour } else { minute };
            let angle = block.start_angle() + delta;
            let r = block.radius();
            Some(RotatedPosition::new(
                self.axis.join(ph + r * angle.cos(), pv + r * angle.sin(), along),
                self.axis.rotation(delta),
            ))
        })
    }

    fn movement_method(&self) -> MovementMethod {
        MovementMethod::Teleport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::FixedClock;
    use approx::assert_relative_eq;

    #[test]
    fn noon_points_up() {
        // 06:00 + 6000 ticks = noon.
        let (hour, minute) = ClockComponent::hand_angles(6000);
        assert_relative_eq!(hour, 0.0);
        assert_relative_eq!(minute, 0.0);
    }

    #[test]
    fn half_past_three() {
        // 15:30 is 9500 ticks after 06:00.
        let (hour, minute) = ClockComponent::hand_angles(9500);
        assert_relative_eq!(hour, -TAU * 3.5 / 12.0, epsilon = 1e-9);
        assert_relative_eq!(minute, -TAU * 0.5, epsilon = 1e-9);
    }

    #[test]
    fn face_must_be_two_thick() {
        let flat = Cuboid::new(BlockPos::new(0, 0, 0), BlockPos::new(4, 4, 0));
        assert!(ClockComponent::new(flat, BlockPos::new(2, 2, 0), Arc::new(FixedClock(0))).is_err());
        let face = Cuboid::new(BlockPos::new(0, 0, 0), BlockPos::new(4, 4, 1));
        let c = ClockComponent::new(face, BlockPos::new(2, 2, 0), Arc::new(FixedClock(0))).unwrap();
        assert_eq!(c.axis, HorizontalAxis::Z);
        assert_eq!(c.hour_layer, 0);
        assert_eq!(c.movement_method(), MovementMethod::Teleport);
    }
}
