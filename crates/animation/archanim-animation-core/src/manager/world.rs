use std::sync::Arc;

use log::{debug, error, warn};

use super::{call_factory, describe_block, AnimatedBlockManager};
use crate::block::AnimatedBlock;
use crate::component::{AnimationComponent, MovementMethod};
use crate::error::AnimationError;
use crate::position::BlockPos;
use crate::scheduler::{assert_main_thread, Scheduler};
use crate::structure::StructureSnapshot;
use crate::world::{AnimationContext, BlockCreation, BlockSubstitutionFactory};

/// Replaces the real blocks of a structure with moving substitutes.
pub struct BlockSubstitutionManager {
    factory: Arc<dyn BlockSubstitutionFactory>,
    scheduler: Arc<dyn Scheduler>,
    max_blocks: Option<usize>,
    blocks: Vec<AnimatedBlock>,
}

impl std::fmt::Debug for BlockSubstitutionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockSubstitutionManager")
            .field("blocks", &self.blocks.len())
            .field("max_blocks", &self.max_blocks)
            .finish()
    }
}

impl BlockSubstitutionManager {
    pub fn new(
        factory: Arc<dyn BlockSubstitutionFactory>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            factory,
            scheduler,
            max_blocks: None,
            blocks: Vec::new(),
        }
    }

    /// Refuse structures with more than `limit` blocks, on top of
    /// `Config::max_animated_blocks` which the animator checks first.
    pub fn with_max_blocks(mut self, limit: Option<usize>) -> Self {
        self.max_blocks = limit;
        self
    }

    /// Remove the original world blocks: everything off the edge first, then
    /// the edge blocks.
    fn remove_originals(&mut self) -> Result<(), AnimationError> {
        for edge_pass in [false, true] {
            for block in self.blocks.iter_mut().filter(|b| b.is_on_edge() == edge_pass) {
                let src = block.source();
                block
                    .entity_mut()
                    .delete_original_block(edge_pass)
                    .map_err(|source| AnimationError::BlockCreation {
                        x: src.x,
                        y: src.y,
                        z: src.z,
                        source,
                    })?;
            }
        }
        Ok(())
    }

    /// Kill every substitute and place its block where `target` says.
    /// Per-block failures are logged and skipped.
    fn place_all(&mut self, what: &str, target: impl Fn(&AnimatedBlock) -> BlockPos) {
        let blocks = std::mem::take(&mut self.blocks);
        let count = blocks.len();
        for mut block in blocks {
            let at = target(&block);
            if let Err(e) = block.entity_mut().kill() {
                warn!("{what}: failed to kill substitute from {:?}: {e:#}", block.source());
            }
            if let Err(e) = block.entity_mut().place_block(at) {
                warn!("{what}: failed to place block at {at:?}: {e:#}");
            }
        }
        debug!("{what}: placed {count} blocks");
    }
}

impl AnimatedBlockManager for BlockSubstitutionManager {
    fn create_animated_blocks(
        &mut self,
        snapshot: &StructureSnapshot,
        component: &dyn AnimationComponent,
        context: &AnimationContext,
        movement: MovementMethod,
    ) -> bool {
        if assert_main_thread(self.scheduler.as_ref(), "create_animated_blocks").is_err() {
            return false;
        }
        let cuboid = snapshot.cuboid;
        if let Some(limit) = self.max_blocks {
            let count = cuboid.volume();
            if count > limit {
                error!(
                    "{}: {}",
                    snapshot.uid,
                    AnimationError::TooManyBlocks { count, limit }
                );
                return false;
            }
        }

        let pivot = snapshot.rotation_point.to_vector();
        for pos in cuboid.iter_animation_order() {
            let info = describe_block(&cuboid, pos, component);
            let creation = BlockCreation {
                source: pos,
                start_position: info.start_position,
                final_position: info.final_position,
                radius: info.radius,
                start_angle: info.start_angle,
                bottom: info.bottom,
                on_edge: info.on_edge,
                pivot,
                context: context.clone(),
                movement_method: movement,
            };
            match call_factory(|| self.factory.create(&creation)) {
                Ok(Some(entity)) => self.blocks.push(AnimatedBlock::new(info, entity)),
                Ok(None) => {}
                Err(source) => {
                    let err = AnimationError::BlockCreation {
                        x: pos.x,
                        y: pos.y,
                        z: pos.z,
                        source,
                    };
                    error!(
                        "{}: {err:#} ({} blocks created so far)",
                        snapshot.uid,
                        self.blocks.len()
                    );
                    return false;
                }
            }
        }

        if let Err(err) = self.remove_originals() {
            error!("{}: {err:#}", snapshot.uid);
            return false;
        }
        debug!("{}: created {} animated blocks", snapshot.uid, self.blocks.len());
        true
    }

    fn spawn_animated_blocks(&mut self) -> Result<(), AnimationError> {
        assert_main_thread(self.scheduler.as_ref(), "prepare_animation")?;
        for block in &mut self.blocks {
            let src = block.source();
            block
                .entity_mut()
                .spawn()
                .map_err(|source| AnimationError::BlockCreation {
                    x: src.x,
                    y: src.y,
                    z: src.z,
                    source,
                })?;
        }
        Ok(())
    }

    fn restore_blocks_on_failure(&mut self) -> Result<(), AnimationError> {
        assert_main_thread(self.scheduler.as_ref(), "restore_blocks_on_failure")?;
        self.place_all("restore", |b| BlockPos::from_position(&b.start_position().position));
        Ok(())
    }

    fn handle_animation_completion(&mut self) -> Result<(), AnimationError> {
        assert_main_thread(self.scheduler.as_ref(), "handle_animation_completion")?;
        self.place_all("completion", |b| BlockPos::from_position(&b.final_position().position));
        Ok(())
    }

    fn animated_blocks(&self) -> &[AnimatedBlock] {
        &self.blocks
    }

    fn animated_blocks_mut(&mut self) -> &mut [AnimatedBlock] {
        &mut self.blocks
    }
}
