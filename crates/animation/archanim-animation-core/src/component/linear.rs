use nalgebra::Vector3;

use super::{progress, AnimationComponent};
use crate::animator::AnimationStep;
use crate::error::AnimationError;
use crate::position::{BlockPos, RotatedPosition};

/// Straight-line movement of every block by the same offset.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearComponent {
    offset: Vector3<f64>,
    duration: u32,
}

impl LinearComponent {
    /// Move `blocks` blocks along the unit direction `unit` over `duration` ticks.
    pub fn new(unit: (i32, i32, i32), blocks: i32, duration: u32) -> Self {
        let offset = Vector3::new(unit.0 as f64, unit.1 as f64, unit.2 as f64) * blocks as f64;
        Self { offset, duration }
    }

    #[inline]
    pub fn offset(&self) -> Vector3<f64> {
        self.offset
    }
}

impl AnimationComponent for LinearComponent {
    fn final_position(&self, x: i32, y: i32, z: i32) -> RotatedPosition {
        RotatedPosition::at(BlockPos::new(x, y, z).to_vector() + self.offset)
    }

    fn execute_animation_step(
        &self,
        step: &mut AnimationStep<'_>,
        ticks: u32,
    ) -> Result<(), AnimationError> {
        let delta = self.offset * progress(ticks, self.duration);
        step.move_each(|block| Some(RotatedPosition::at(block.start_position().position + delta)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_position_is_offset() {
        let c = LinearComponent::new((0, 0, -1), 3, 10);
        let p = c.final_position(4, 5, 6);
        assert_eq!(p.position, Vector3::new(4.0, 5.0, 3.0));
        assert_eq!(p.rotation, Vector3::zeros());
        assert_eq!(c.radius(4, 5, 6), -1.0);
    }
}
