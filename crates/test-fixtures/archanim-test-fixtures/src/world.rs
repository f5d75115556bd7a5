//! In-memory block world with an ordered event journal.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::bail;
use archanim_animation_core::{
    BlockCreation, BlockEntity, BlockPos, BlockSubstitutionFactory, Cuboid, MovementMethod,
    PreviewBlock, PreviewBlockFactory, PreviewColor, RotatedPosition, TaskHandle,
};

/// Everything that happened to the world, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum WorldEvent {
    Created {
        source: BlockPos,
    },
    Deleted {
        pos: BlockPos,
        edge_pass: bool,
    },
    Spawned {
        source: BlockPos,
    },
    Moved {
        source: BlockPos,
        target: RotatedPosition,
        method: MovementMethod,
        ticks_remaining: Option<u32>,
    },
    Killed {
        source: BlockPos,
    },
    Placed {
        source: BlockPos,
        at: BlockPos,
    },
    Previewed {
        source: BlockPos,
        color: PreviewColor,
    },
    Cancelled {
        handle: TaskHandle,
    },
}

#[derive(Default)]
struct Inner {
    blocks: BTreeMap<BlockPos, String>,
    journal: Vec<WorldEvent>,
}

/// Blocks by position, plus the journal of every mutation.
#[derive(Default)]
pub struct RecordingWorld {
    inner: Mutex<Inner>,
}

impl RecordingWorld {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set every block of `cuboid` to `material`.
    pub fn fill(&self, cuboid: &Cuboid, material: &str) {
        let mut inner = self.lock();
        for pos in cuboid.iter_animation_order() {
            inner.blocks.insert(pos, material.to_string());
        }
    }

    pub fn set_block(&self, pos: BlockPos, material: &str) {
        self.lock().blocks.insert(pos, material.to_string());
    }

    pub fn block(&self, pos: BlockPos) -> Option<String> {
        self.lock().blocks.get(&pos).cloned()
    }

    pub fn remove_block(&self, pos: BlockPos) -> Option<String> {
        self.lock().blocks.remove(&pos)
    }

    pub fn block_count(&self) -> usize {
        self.lock().blocks.len()
    }

    pub fn positions(&self) -> Vec<BlockPos> {
        self.lock().blocks.keys().copied().collect()
    }

    pub fn record(&self, event: WorldEvent) {
        self.lock().journal.push(event);
    }

    pub fn events(&self) -> Vec<WorldEvent> {
        self.lock().journal.clone()
    }

    pub fn clear_events(&self) {
        self.lock().journal.clear();
    }

    /// Positions of the original blocks removed, in removal order.
    pub fn deletions(&self) -> Vec<(BlockPos, bool)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                WorldEvent::Deleted { pos, edge_pass } => Some((pos, edge_pass)),
                _ => None,
            })
            .collect()
    }

    /// Where real blocks were placed, in order.
    pub fn placements(&self) -> Vec<BlockPos> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                WorldEvent::Placed { at, .. } => Some(at),
                _ => None,
            })
            .collect()
    }

    pub fn moves_of(&self, source: BlockPos) -> Vec<RotatedPosition> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                WorldEvent::Moved { source: s, target, .. } if s == source => Some(target),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&WorldEvent) -> bool) -> usize {
        self.lock().journal.iter().filter(|e| pred(e)).count()
    }

    /// Index of the first event matching `pred`.
    pub fn position_of(&self, pred: impl Fn(&WorldEvent) -> bool) -> Option<usize> {
        self.lock().journal.iter().position(pred)
    }
}

/// Substitute entity backed by a [`RecordingWorld`].
pub struct FakeEntity {
    world: Arc<RecordingWorld>,
    source: BlockPos,
    material: String,
    fail_moves: bool,
    fail_spawn: bool,
}

impl BlockEntity for FakeEntity {
    fn spawn(&mut self) -> anyhow::Result<()> {
        if self.fail_spawn {
            bail!("entity at {:?} could not be spawned", self.source);
        }
        self.world.record(WorldEvent::Spawned {
            source: self.source,
        });
        Ok(())
    }

    fn kill(&mut self) -> anyhow::Result<()> {
        self.world.record(WorldEvent::Killed {
            source: self.source,
        });
        Ok(())
    }

    fn move_to_target(
        &mut self,
        target: &RotatedPosition,
        method: MovementMethod,
        ticks_remaining: Option<u32>,
    ) -> anyhow::Result<()> {
        if self.fail_moves {
            bail!("entity at {:?} is stuck", self.source);
        }
        self.world.record(WorldEvent::Moved {
            source: self.source,
            target: *target,
            method,
            ticks_remaining,
        });
        Ok(())
    }

    fn delete_original_block(&mut self, edge_pass: bool) -> anyhow::Result<()> {
        self.world.remove_block(self.source);
        self.world.record(WorldEvent::Deleted {
            pos: self.source,
            edge_pass,
        });
        Ok(())
    }

    fn place_block(&mut self, at: BlockPos) -> anyhow::Result<()> {
        self.world.set_block(at, &self.material);
        self.world.record(WorldEvent::Placed {
            source: self.source,
            at,
        });
        Ok(())
    }
}

/// Factory producing [`FakeEntity`] substitutes for the blocks of a
/// [`RecordingWorld`]. Air (no block) is always declined.
#[derive(Clone)]
pub struct FakeSubstitutionFactory {
    world: Arc<RecordingWorld>,
    declined: HashSet<String>,
    fail_at: Option<BlockPos>,
    stuck: HashSet<BlockPos>,
    unspawnable: HashSet<BlockPos>,
}

impl FakeSubstitutionFactory {
    pub fn new(world: Arc<RecordingWorld>) -> Self {
        Self {
            world,
            declined: HashSet::new(),
            fail_at: None,
            stuck: HashSet::new(),
            unspawnable: HashSet::new(),
        }
    }

    /// Decline blocks of `material`.
    pub fn decline(mut self, material: &str) -> Self {
        self.declined.insert(material.to_string());
        self
    }

    /// Fail creation at `pos`.
    pub fn fail_at(mut self, pos: BlockPos) -> Self {
        self.fail_at = Some(pos);
        self
    }

    /// The substitute for `pos` refuses to move.
    pub fn stuck_at(mut self, pos: BlockPos) -> Self {
        self.stuck.insert(pos);
        self
    }

    /// The substitute for `pos` is created but cannot be spawned.
    pub fn unspawnable_at(mut self, pos: BlockPos) -> Self {
        self.unspawnable.insert(pos);
        self
    }
}

impl BlockSubstitutionFactory for FakeSubstitutionFactory {
    fn create(&self, creation: &BlockCreation) -> anyhow::Result<Option<Box<dyn BlockEntity>>> {
        if self.fail_at == Some(creation.source) {
            bail!("chunk at {:?} is not loaded", creation.source);
        }
        let Some(material) = self.world.block(creation.source) else {
            return Ok(None);
        };
        if self.declined.contains(&material) {
            return Ok(None);
        }
        self.world.record(WorldEvent::Created {
            source: creation.source,
        });
        Ok(Some(Box::new(FakeEntity {
            world: self.world.clone(),
            source: creation.source,
            material,
            fail_moves: self.stuck.contains(&creation.source),
            fail_spawn: self.unspawnable.contains(&creation.source),
        })))
    }
}

/// Ghost marker; cannot touch world blocks.
pub struct GhostEntity {
    world: Arc<RecordingWorld>,
    source: BlockPos,
}

impl BlockEntity for GhostEntity {
    fn spawn(&mut self) -> anyhow::Result<()> {
        self.world.record(WorldEvent::Spawned {
            source: self.source,
        });
        Ok(())
    }

    fn kill(&mut self) -> anyhow::Result<()> {
        self.world.record(WorldEvent::Killed {
            source: self.source,
        });
        Ok(())
    }

    fn move_to_target(
        &mut self,
        target: &RotatedPosition,
        method: MovementMethod,
        ticks_remaining: Option<u32>,
    ) -> anyhow::Result<()> {
        self.world.record(WorldEvent::Moved {
            source: self.source,
            target: *target,
            method,
            ticks_remaining,
        });
        Ok(())
    }
}

#[derive(Clone)]
pub struct FakePreviewFactory {
    world: Arc<RecordingWorld>,
}

impl FakePreviewFactory {
    pub fn new(world: Arc<RecordingWorld>) -> Self {
        Self { world }
    }
}

impl PreviewBlockFactory for FakePreviewFactory {
    fn create_preview(&self, block: &PreviewBlock) -> anyhow::Result<Option<Box<dyn BlockEntity>>> {
        self.world.record(WorldEvent::Previewed {
            source: block.source,
            color: block.color,
        });
        Ok(Some(Box::new(GhostEntity {
            world: self.world.clone(),
            source: block.source,
        })))
    }
}
