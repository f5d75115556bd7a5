//! Which structures are busy, and with what.
//!
//! A structure being toggled is first marked busy (write access), then its
//! animator is registered. At most one animator with write access may run
//! per structure; previews may share a structure with each other but never
//! with a writer. Animators report back exactly once when they finish.

use std::sync::{Arc, Mutex};

use hashbrown::{HashMap, HashSet};
use log::{debug, warn};

use crate::animator::Animator;
use crate::ids::StructureId;
use crate::scheduler::lock;

/// Receives the end-of-life notification of every animator.
pub trait AnimationTracker: Send + Sync {
    /// Called once per animator, after its blocks were placed or restored.
    fn process_finished_animation(&self, animator: &Animator);
}

#[derive(Default)]
struct Registry {
    busy: HashSet<StructureId>,
    animators: HashMap<StructureId, Vec<Arc<Animator>>>,
}

/// Tracks running animations per structure.
#[derive(Default)]
pub struct StructureActivityManager {
    inner: Mutex<Registry>,
}

impl std::fmt::Debug for StructureActivityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let r = lock(&self.inner);
        f.debug_struct("StructureActivityManager")
            .field("busy", &r.busy.len())
            .field("animators", &r.animators.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

impl StructureActivityManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim write access to `uid`. Fails when the structure is already
    /// busy or a writer animates it.
    pub fn try_register_busy(&self, uid: StructureId) -> bool {
        let mut r = lock(&self.inner);
        let has_writer = r
            .animators
            .get(&uid)
            .is_some_and(|list| list.iter().any(|a| a.animation_type().requires_write_access()));
        if has_writer {
            return false;
        }
        r.busy.insert(uid)
    }

    /// Release write access claimed with [`Self::try_register_busy`].
    pub fn set_not_busy(&self, uid: StructureId) {
        lock(&self.inner).busy.remove(&uid);
    }

    /// Register a freshly built animator. Returns `false` when another
    /// writer already animates the structure, or when a preview would
    /// overlap a writer.
    pub fn add_animator(&self, animator: Arc<Animator>) -> bool {
        let uid = animator.structure_id();
        let writes = animator.animation_type().requires_write_access();
        let mut r = lock(&self.inner);
        if let Some(list) = r.animators.get(&uid) {
            if list.iter().any(|a| a.animation_type().requires_write_access()) {
                warn!("{uid}: refusing {} while a writer is active", animator.id());
                return false;
            }
            if writes && !list.is_empty() {
                warn!("{uid}: refusing writer {} while previews are active", animator.id());
                return false;
            }
        }
        debug!("{uid}: registered {}", animator.id());
        r.animators.entry(uid).or_default().push(animator);
        true
    }

    /// Claimed for writing or animating with write access.
    pub fn is_busy(&self, uid: StructureId) -> bool {
        let r = lock(&self.inner);
        r.busy.contains(&uid)
            || r.animators
                .get(&uid)
                .is_some_and(|list| list.iter().any(|a| a.animation_type().requires_write_access()))
    }

    /// Any animator, preview included, is registered for `uid`.
    pub fn is_animating(&self, uid: StructureId) -> bool {
        lock(&self.inner)
            .animators
            .get(&uid)
            .is_some_and(|list| !list.is_empty())
    }

    /// The writer animating `uid`, or else the first preview.
    pub fn animator(&self, uid: StructureId) -> Option<Arc<Animator>> {
        let r = lock(&self.inner);
        let list = r.animators.get(&uid)?;
        list.iter()
            .find(|a| a.animation_type().requires_write_access())
            .or_else(|| list.first())
            .cloned()
    }

    pub fn animators_for(&self, uid: StructureId) -> Vec<Arc<Animator>> {
        lock(&self.inner)
            .animators
            .get(&uid)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of registered animators.
    pub fn active_count(&self) -> usize {
        lock(&self.inner).animators.values().map(Vec::len).sum()
    }

    /// Abort every registered animator, e.g. when the host shuts down.
    pub fn stop_animators(&self) {
        let all: Vec<Arc<Animator>> = {
            let r = lock(&self.inner);
            r.animators.values().flatten().cloned().collect()
        };
        debug!("aborting {} animators", all.len());
        for animator in all {
            animator.abort();
        }
    }
}

impl AnimationTracker for StructureActivityManager {
    fn process_finished_animation(&self, animator: &Animator) {
        let uid = animator.structure_id();
        let mut r = lock(&self.inner);
        if let Some(list) = r.animators.get_mut(&uid) {
            list.retain(|a| a.id() != animator.id());
            if list.is_empty() {
                r.animators.remove(&uid);
            }
        }
        if animator.animation_type().requires_write_access() {
            r.busy.remove(&uid);
        }
        debug!("{uid}: {} finished", animator.id());
    }
}
