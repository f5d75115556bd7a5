//! Structure facts consumed by the engine.
//!
//! A [`StructureSnapshot`] is the immutable record of a structure as it was
//! when the toggle request was made. The live, mutable structure is owned by
//! the host and never touched from here.

use serde::{Deserialize, Serialize};

use crate::ids::StructureId;
use crate::position::{BlockPos, Cuboid};

/// Structure types with built-in animation components.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    BigDoor,
    Drawbridge,
    Portcullis,
    SlidingDoor,
    Windmill,
    Clock,
    RevolvingDoor,
}

impl StructureKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BigDoor => "big_door",
            Self::Drawbridge => "drawbridge",
            Self::Portcullis => "portcullis",
            Self::SlidingDoor => "sliding_door",
            Self::Windmill => "windmill",
            Self::Clock => "clock",
            Self::RevolvingDoor => "revolving_door",
        }
    }

    /// Kinds whose animations have no natural end.
    #[inline]
    pub fn is_perpetual_capable(&self) -> bool {
        matches!(self, Self::Windmill | Self::Clock)
    }
}

/// Direction a structure opens in.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementDirection {
    North,
    East,
    South,
    West,
    Up,
    Down,
    Clockwise,
    Counterclockwise,
}

impl MovementDirection {
    /// Unit offset for straight directions; `None` for rotations.
    pub fn unit(&self) -> Option<(i32, i32, i32)> {
        match self {
            Self::North => Some((0, 0, -1)),
            Self::East => Some((1, 0, 0)),
            Self::South => Some((0, 0, 1)),
            Self::West => Some((-1, 0, 0)),
            Self::Up => Some((0, 1, 0)),
            Self::Down => Some((0, -1, 0)),
            Self::Clockwise | Self::Counterclockwise => None,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Clockwise => Self::Counterclockwise,
            Self::Counterclockwise => Self::Clockwise,
        }
    }
}

/// What the animation does to the world.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationType {
    /// Real blocks are replaced by substitutes and placed again at the end.
    #[default]
    MoveBlocks,
    /// Ghost markers only; the world is left alone.
    Preview,
}

impl AnimationType {
    #[inline]
    pub fn requires_write_access(&self) -> bool {
        matches!(self, Self::MoveBlocks)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCause {
    #[default]
    Player,
    Redstone,
    Server,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Open,
    Close,
    #[default]
    Toggle,
}

/// Player responsible for a toggle.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PlayerRef {
    pub uuid: String,
    pub name: String,
}

/// Immutable pre-animation facts about a structure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructureSnapshot {
    pub uid: StructureId,
    pub name: String,
    pub kind: StructureKind,
    pub world: String,
    pub cuboid: Cuboid,
    /// Pivot/engine point rotations are computed around.
    pub rotation_point: BlockPos,
    pub power_block: BlockPos,
    #[serde(default)]
    pub is_open: bool,
    pub open_direction: MovementDirection,
    /// Distance travelled by sliding kinds.
    #[serde(default)]
    pub blocks_to_move: i32,
    /// Number of quarter turns for revolving kinds.
    #[serde(default = "default_quarter_circles")]
    pub quarter_circles: u32,
}

fn default_quarter_circles() -> u32 {
    1
}

impl StructureSnapshot {
    /// Direction of the current toggle: the open direction when closed,
    /// its opposite when open.
    pub fn current_direction(&self) -> MovementDirection {
        if self.is_open {
            self.open_direction.opposite()
        } else {
            self.open_direction
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perpetual_capable_kinds() {
        assert!(StructureKind::Windmill.is_perpetual_capable());
        assert!(StructureKind::Clock.is_perpetual_capable());
        assert!(!StructureKind::BigDoor.is_perpetual_capable());
    }

    #[test]
    fn direction_flips_when_open() {
        let json = r#"{
            "uid": 7, "name": "gate", "kind": "sliding_door", "world": "overworld",
            "cuboid": { "min": { "x": 0, "y": 0, "z": 0 }, "max": { "x": 2, "y": 2, "z": 0 } },
            "rotation_point": { "x": 1, "y": 0, "z": 0 },
            "power_block": { "x": 1, "y": -2, "z": 0 },
            "is_open": true, "open_direction": "east", "blocks_to_move": 3
        }"#;
        let snap: StructureSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.quarter_circles, 1);
        assert_eq!(snap.current_direction(), MovementDirection::West);
    }

    #[test]
    fn only_block_moves_need_write_access() {
        assert!(AnimationType::MoveBlocks.requires_write_access());
        assert!(!AnimationType::Preview.requires_write_access());
    }
}
