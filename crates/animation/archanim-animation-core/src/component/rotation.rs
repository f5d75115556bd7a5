use std::f64::consts::FRAC_PI_2;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::{progress, AnimationComponent};
use crate::animator::AnimationStep;
use crate::error::AnimationError;
use crate::position::{BlockPos, RotatedPosition};
use crate::structure::MovementDirection;

/// Rotate the integer offset (a, b) by `quarters` counterclockwise quarter
/// turns in the (a, b) plane. Exact, so final positions never drift.
pub(super) fn quarter_turns(a: i32, b: i32, quarters: i32) -> (i32, i32) {
    match quarters.rem_euclid(4) {
        0 => (a, b),
        1 => (-b, a),
        2 => (-a, -b),
        _ => (b, -a),
    }
}

/// Rotation about the vertical axis through a pivot, in the (x, z) plane.
///
/// A positive sign turns clockwise seen from above (north towards east).
#[derive(Clone, Debug, PartialEq)]
pub struct HorizontalRotationComponent {
    pivot: BlockPos,
    sign: f64,
    quarter_circles: u32,
    duration: u32,
}

impl HorizontalRotationComponent {
    pub fn new(pivot: BlockPos, sign: f64, quarter_circles: u32, duration: u32) -> Self {
        Self {
            pivot,
            sign: sign.signum(),
            quarter_circles,
            duration,
        }
    }

    #[inline]
    fn total_angle(&self) -> f64 {
        self.sign * FRAC_PI_2 * self.quarter_circles as f64
    }
}

impl AnimationComponent for HorizontalRotationComponent {
    fn final_position(&self, x: i32, y: i32, z: i32) -> RotatedPosition {
        let quarters = self.sign as i32 * self.quarter_circles as i32;
        let (dx, dz) = quarter_turns(x - self.pivot.x, z - self.pivot.z, quarters);
        RotatedPosition::new(
            BlockPos::new(self.pivot.x + dx, y, self.pivot.z + dz).to_vector(),
            Vector3::new(0.0, self.total_angle(), 0.0),
        )
    }

    fn radius(&self, x: i32, _y: i32, z: i32) -> f64 {
        ((x - self.pivot.x) as f64).hypot((z - self.pivot.z) as f64)
    }

    fn start_angle(&self, x: i32, _y: i32, z: i32) -> f64 {
        ((z - self.pivot.z) as f64).atan2((x - self.pivot.x) as f64)
    }

    fn execute_animation_step(
        &self,
        step: &mut AnimationStep<'_>,
        ticks: u32,
    ) -> Result<(), AnimationError> {
        let delta = self.total_angle() * progress(ticks, self.duration);
        let (px, pz) = (self.pivot.x as f64, self.pivot.z as f64);
        step.move_each(|block| {
            if block.is_stationary() {
                return None;
            }
            let angle = block.start_angle() + delta;
            let r = block.radius();
            let y = block.start_position().position.y;
            Some(RotatedPosition::new(
                Vector3::new(px + r * angle.cos(), y, pz + r * angle.sin()),
                Vector3::new(0.0, delta, 0.0),
            ))
        })
    }
}

/// Horizontal axis a vertical rotation turns about.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum HorizontalAxis {
    /// Runs east-west; blocks turn in the (z, y) plane.
    X,
    /// Runs north-south; blocks turn in the (x, y) plane.
    Z,
}

impl HorizontalAxis {
    /// Split a pivot-relative offset into (horizontal, vertical) plane coordinates.
    #[inline]
    pub(super) fn plane(&self, dx: i32, dy: i32, dz: i32) -> (i32, i32) {
        match self {
            Self::X => (dz, dy),
            Self::Z => (dx, dy),
        }
    }

    /// Inverse of [`HorizontalAxis::plane`]; `along` is the coordinate on the axis.
    #[inline]
    pub(super) fn join(&self, h: f64, v: f64, along: f64) -> Vector3<f64> {
        match self {
            Self::X => Vector3::new(along, v, h),
            Self::Z => Vector3::new(h, v, along),
        }
    }

    #[inline]
    pub(super) fn along(&self, position: &Vector3<f64>) -> f64 {
        match self {
            Self::X => position.x,
            Self::Z => position.z,
        }
    }

    #[inline]
    pub(super) fn rotation(&self, angle: f64) -> Vector3<f64> {
        match self {
            Self::X => Vector3::new(angle, 0.0, 0.0),
            Self::Z => Vector3::new(0.0, 0.0, angle),
        }
    }
}

/// Rotation about a horizontal axis through a pivot (drawbridges, windmills).
///
/// A positive sign tips the top of the structure towards the negative end
/// of the horizontal plane axis (north or west).
#[derive(Clone, Debug, PartialEq)]
pub struct VerticalRotationComponent {
    pivot: BlockPos,
    axis: HorizontalAxis,
    sign: f64,
    duration: u32,
    perpetual: bool,
}

impl VerticalRotationComponent {
    pub fn new(pivot: BlockPos, axis: HorizontalAxis, sign: f64, duration: u32) -> Self {
        Self {
            pivot,
            axis,
            sign: sign.signum(),
            duration,
            perpetual: false,
        }
    }

    /// Keep turning a quarter circle every `duration` ticks, forever. The
    /// final position of every block is its start.
    pub fn perpetual(mut self) -> Self {
        self.perpetual = true;
        self
    }

    /// Axis and sign for a drawbridge falling in `direction`.
    pub fn axis_for(direction: MovementDirection) -> Option<(HorizontalAxis, f64)> {
        match direction {
            MovementDirection::North => Some((HorizontalAxis::X, 1.0)),
            MovementDirection::South => Some((HorizontalAxis::X, -1.0)),
            MovementDirection::West => Some((HorizontalAxis::Z, 1.0)),
            MovementDirection::East => Some((HorizontalAxis::Z, -1.0)),
            _ => None,
        }
    }

    #[inline]
    pub fn is_perpetual(&self) -> bool {
        self.perpetual
    }

    fn angle_after(&self, ticks: u32) -> f64 {
        if self.perpetual {
            let per_tick = FRAC_PI_2 / self.duration.max(1) as f64;
            self.sign * per_tick * ticks as f64
        } else {
            self.sign * FRAC_PI_2 * progress(ticks, self.duration)
        }
    }

    fn offset(&self, x: i32, y: i32, z: i32) -> (i32, i32) {
        self.axis
            .plane(x - self.pivot.x, y - self.pivot.y, z - self.pivot.z)
    }
}

impl AnimationComponent for VerticalRotationComponent {
    fn final_position(&self, x: i32, y: i32, z: i32) -> RotatedPosition {
        if self.perpetual {
            return self.start_position(x, y, z);
        }
        let (h, v) = self.offset(x, y, z);
        let (h, v) = quarter_turns(h, v, self.sign as i32);
        let (ph, pv) = self.axis.plane(self.pivot.x, self.pivot.y, self.pivot.z);
        let along = self.axis.along(&BlockPos::new(x, y, z).to_vector());
        RotatedPosition::new(
            self.axis.join((ph + h) as f64, (pv + v) as f64, along),
            self.axis.rotation(self.sign * FRAC_PI_2),
        )
    }

    fn radius(&self, x: i32, y: i32, z: i32) -> f64 {
        let (h, v) = self.offset(x, y, z);
        (h as f64).hypot(v as f64)
    }

    fn start_angle(&self, x: i32, y: i32, z: i32) -> f64 {
        let (h, v) = self.offset(x, y, z);
        (v as f64).atan2(h as f64)
    }

    fn execute_animation_step(
        &self,
        step: &mut AnimationStep<'_>,
        ticks: u32,
    ) -> Result<(), AnimationError> {
        let delta = self.angle_after(ticks);
        let (ph, pv) = self.axis.plane(self.pivot.x, self.pivot.y, self.pivot.z);
        let (ph, pv) = (ph as f64, pv as f64);
        let axis = self.axis;
        step.move_each(|block| {
            if block.is_stationary() {
                return None;
            }
            let angle = block.start_angle() + delta;
            let r = block.radius();
            let along = axis.along(&block.start_position().position);
            Some(RotatedPosition::new(
                axis.join(ph + r * angle.cos(), pv + r * angle.sin(), along),
                axis.rotation(delta),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn quarter_turn_cycle() {
        assert_eq!(quarter_turns(1, 0, 1), (0, 1));
        assert_eq!(quarter_turns(1, 0, 2), (-1, 0));
        assert_eq!(quarter_turns(1, 0, -1), (0, -1));
        assert_eq!(quarter_turns(3, 2, 4), (3, 2));
    }

    #[test]
    fn big_door_clockwise_swings_north_to_east() {
        let c = HorizontalRotationComponent::new(BlockPos::new(0, 64, 0), 1.0, 1, 20);
        // Block two north of the hinge ends up two east of it.
        let p = c.final_position(0, 65, -2);
        assert_eq!(p.block(), BlockPos::new(2, 65, 0));
        assert_relative_eq!(c.radius(0, 65, -2), 2.0);
        assert_eq!(c.radius(0, 70, 0), 0.0);
    }

    #[test]
    fn revolving_three_quarters() {
        let c = HorizontalRotationComponent::new(BlockPos::new(0, 0, 0), -1.0, 3, 20);
        // Three counterclockwise quarters equal one clockwise quarter.
        let p = c.final_position(0, 0, -2);
        assert_eq!(p.block(), BlockPos::new(2, 0, 0));
    }

    #[test]
    fn drawbridge_north_lays_flat() {
        let (axis, sign) = VerticalRotationComponent::axis_for(MovementDirection::North).unwrap();
        let c = VerticalRotationComponent::new(BlockPos::new(5, 10, 5), axis, sign, 20);
        // Block three above the hinge falls three blocks north.
        let p = c.final_position(5, 13, 5);
        assert_eq!(p.block(), BlockPos::new(5, 10, 2));
        assert_relative_eq!(p.rotation.x, FRAC_PI_2);
    }

    #[test]
    fn drawbridge_east_lays_flat() {
        let (axis, sign) = VerticalRotationComponent::axis_for(MovementDirection::East).unwrap();
        let c = VerticalRotationComponent::new(BlockPos::new(0, 0, 0), axis, sign, 20);
        let p = c.final_position(0, 4, 7);
        assert_eq!(p.block(), BlockPos::new(4, 0, 7));
    }

    #[test]
    fn windmill_returns_to_start() {
        let c = VerticalRotationComponent::new(BlockPos::new(0, 0, 0), HorizontalAxis::X, 1.0, 20)
            .perpetual();
        let p = c.final_position(0, 3, 1);
        assert_eq!(p.block(), BlockPos::new(0, 3, 1));
        assert!(c.angle_after(100) > std::f64::consts::PI);
    }
}
