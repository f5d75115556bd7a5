//! Kinematic primitives: integer block positions, rotated positions and cuboids.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Integer world coordinates of one block.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Block that receives a real block placed from an entity at `position`.
    /// X and Z are floored, Y is rounded.
    #[inline]
    pub fn from_position(position: &Vector3<f64>) -> Self {
        Self {
            x: position.x.floor() as i32,
            y: position.y.round() as i32,
            z: position.z.floor() as i32,
        }
    }

    #[inline]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x as f64, self.y as f64, self.z as f64)
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

impl From<(i32, i32, i32)> for BlockPos {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self::new(x, y, z)
    }
}

/// Immutable position plus rotation (radians about X, Y and Z).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RotatedPosition {
    pub position: Vector3<f64>,
    pub rotation: Vector3<f64>,
}

impl RotatedPosition {
    #[inline]
    pub fn new(position: Vector3<f64>, rotation: Vector3<f64>) -> Self {
        Self { position, rotation }
    }

    /// Position without any rotation.
    #[inline]
    pub fn at(position: Vector3<f64>) -> Self {
        Self::new(position, Vector3::zeros())
    }

    /// The identity placement of a block: its own coordinates, no rotation.
    #[inline]
    pub fn from_block(pos: BlockPos) -> Self {
        Self::at(pos.to_vector())
    }

    /// Block a real block would be placed in for this position.
    #[inline]
    pub fn block(&self) -> BlockPos {
        BlockPos::from_position(&self.position)
    }

    /// Straight-line distance between the two positions, ignoring rotation.
    #[inline]
    pub fn distance(&self, other: &RotatedPosition) -> f64 {
        (self.position - other.position).norm()
    }
}

/// Axis-aligned box of blocks. `min <= max` holds on every axis.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "RawCuboid")]
pub struct Cuboid {
    min: BlockPos,
    max: BlockPos,
}

#[derive(Deserialize)]
struct RawCuboid {
    min: BlockPos,
    max: BlockPos,
}

impl From<RawCuboid> for Cuboid {
    fn from(raw: RawCuboid) -> Self {
        Cuboid::new(raw.min, raw.max)
    }
}

impl Cuboid {
    /// Build a cuboid from any two opposite corners.
    pub fn new(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    #[inline]
    pub fn min(&self) -> BlockPos {
        self.min
    }

    #[inline]
    pub fn max(&self) -> BlockPos {
        self.max
    }

    /// Number of blocks along each axis.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32, u32) {
        (
            (self.max.x - self.min.x) as u32 + 1,
            (self.max.y - self.min.y) as u32 + 1,
            (self.max.z - self.min.z) as u32 + 1,
        )
    }

    #[inline]
    pub fn volume(&self) -> usize {
        let (x, y, z) = self.dimensions();
        x as usize * y as usize * z as usize
    }

    #[inline]
    pub fn contains(&self, pos: BlockPos) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z)
    }

    /// On the horizontal boundary of the cuboid (x or z face).
    #[inline]
    pub fn is_on_edge(&self, pos: BlockPos) -> bool {
        pos.x == self.min.x || pos.x == self.max.x || pos.z == self.min.z || pos.z == self.max.z
    }

    #[inline]
    pub fn is_bottom(&self, pos: BlockPos) -> bool {
        pos.y == self.min.y
    }

    /// Corner blocks of the cuboid (all three coordinates on a face).
    #[inline]
    pub fn is_corner(&self, pos: BlockPos) -> bool {
        (pos.x == self.min.x || pos.x == self.max.x)
            && (pos.y == self.min.y || pos.y == self.max.y)
            && (pos.z == self.min.z || pos.z == self.max.z)
    }

    /// Center of the cuboid in block space.
    pub fn center(&self) -> Vector3<f64> {
        (self.min.to_vector() + self.max.to_vector()) / 2.0
    }

    /// Every block, x ascending, y descending, z ascending.
    ///
    /// Columns are walked top-down; block removal ordering relies on it.
    pub fn iter_animation_order(&self) -> impl Iterator<Item = BlockPos> {
        let (min, max) = (self.min, self.max);
        (min.x..=max.x).flat_map(move |x| {
            (min.y..=max.y)
                .rev()
                .flat_map(move |y| (min.z..=max.z).map(move |z| BlockPos::new(x, y, z)))
        })
    }

    /// Outward-rounded bounding box of a set of positions: minima floored,
    /// maxima ceiled. Returns `None` for an empty set.
    pub fn bounding<'a, I>(positions: I) -> Option<Cuboid>
    where
        I: IntoIterator<Item = &'a Vector3<f64>>,
    {
        let mut iter = positions.into_iter();
        let first = iter.next()?;
        let (mut lo, mut hi) = (*first, *first);
        for p in iter {
            lo = lo.inf(p);
            hi = hi.sup(p);
        }
        Some(Cuboid {
            min: BlockPos::new(lo.x.floor() as i32, lo.y.floor() as i32, lo.z.floor() as i32),
            max: BlockPos::new(hi.x.ceil() as i32, hi.y.ceil() as i32, hi.z.ceil() as i32),
        })
    }
}
