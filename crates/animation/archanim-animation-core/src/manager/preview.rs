use std::sync::Arc;

use log::{debug, error, warn};

use super::{call_factory, describe_block, AnimatedBlockManager};
use crate::block::AnimatedBlock;
use crate::component::{AnimationComponent, MovementMethod};
use crate::error::AnimationError;
use crate::position::{BlockPos, Cuboid};
use crate::scheduler::{assert_main_thread, Scheduler};
use crate::structure::StructureSnapshot;
use crate::world::{AnimationContext, PreviewBlock, PreviewBlockFactory, PreviewColor};

/// Shows where a structure would move with ghost markers. Never touches
/// real world blocks.
pub struct PreviewBlockManager {
    factory: Arc<dyn PreviewBlockFactory>,
    scheduler: Arc<dyn Scheduler>,
    blocks: Vec<AnimatedBlock>,
}

impl std::fmt::Debug for PreviewBlockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewBlockManager")
            .field("blocks", &self.blocks.len())
            .finish()
    }
}

/// Role of `pos` in the preview, or `None` when the checkerboard skips it.
///
/// Corners and the outer shell are always shown; the body only on every
/// other block.
pub(crate) fn preview_color(cuboid: &Cuboid, pos: BlockPos) -> Option<PreviewColor> {
    let (min, max) = (cuboid.min(), cuboid.max());
    if cuboid.is_corner(pos) {
        return Some(PreviewColor::Corner);
    }
    if cuboid.is_on_edge(pos) || pos.y == min.y || pos.y == max.y {
        return Some(PreviewColor::Edge);
    }
    ((pos.x + pos.y + pos.z).rem_euclid(2) == 0).then_some(PreviewColor::Body)
}

impl PreviewBlockManager {
    pub fn new(factory: Arc<dyn PreviewBlockFactory>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            factory,
            scheduler,
            blocks: Vec::new(),
        }
    }

    fn despawn_all(&mut self, what: &str) {
        let blocks = std::mem::take(&mut self.blocks);
        let count = blocks.len();
        for mut block in blocks {
            if let Err(e) = block.entity_mut().kill() {
                warn!("{what}: failed to despawn preview at {:?}: {e:#}", block.source());
            }
        }
        debug!("{what}: despawned {count} preview markers");
    }
}

impl AnimatedBlockManager for PreviewBlockManager {
    fn create_animated_blocks(
        &mut self,
        snapshot: &StructureSnapshot,
        component: &dyn AnimationComponent,
        context: &AnimationContext,
        _movement: MovementMethod,
    ) -> bool {
        if assert_main_thread(self.scheduler.as_ref(), "create_animated_blocks").is_err() {
            return false;
        }
        let cuboid = snapshot.cuboid;
        for pos in cuboid.iter_animation_order() {
            let Some(color) = preview_color(&cuboid, pos) else {
                continue;
            };
            let info = describe_block(&cuboid, pos, component);
            let request = PreviewBlock {
                source: pos,
                start_position: info.start_position,
                final_position: info.final_position,
                color,
                context: context.clone(),
            };
            match call_factory(|| self.factory.create_preview(&request)) {
                Ok(Some(entity)) => self.blocks.push(AnimatedBlock::new(info, entity)),
                Ok(None) => {}
                Err(source) => {
                    let err = AnimationError::BlockCreation {
                        x: pos.x,
                        y: pos.y,
                        z: pos.z,
                        source,
                    };
                    error!("{}: preview {err:#}", snapshot.uid);
                    return false;
                }
            }
        }
        debug!("{}: created {} preview markers", snapshot.uid, self.blocks.len());
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
        self.despawn_all("restore");
        Ok(())
    }

    fn handle_animation_completion(&mut self) -> Result<(), AnimationError> {
        assert_main_thread(self.scheduler.as_ref(), "handle_animation_completion")?;
        self.despawn_all("completion");
        Ok(())
    }

    fn animated_blocks(&self) -> &[AnimatedBlock] {
        &self.blocks
    }

    fn animated_blocks_mut(&mut self) -> &mut [AnimatedBlock] {
        &mut self.blocks
    }
}
