//! Identifiers and simple allocators for core entities.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Database uid of a structure.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct StructureId(pub u64);

/// Identity of one in-flight animation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct AnimationId(pub u64);

/// Handle to a repeating or delayed scheduler task.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct TaskHandle(pub u64);

impl fmt::Display for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "structure#{}", self.0)
    }
}

impl fmt::Display for AnimationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "animation#{}", self.0)
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Monotonic allocator for AnimationId and TaskHandle.
/// Safe to share between threads; ids are opaque externally.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_animation: AtomicU64,
    next_task: AtomicU64,
}

impl IdAllocator {
    pub const fn new() -> Self {
        Self {
            next_animation: AtomicU64::new(0),
            next_task: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn alloc_animation(&self) -> AnimationId {
        AnimationId(self.next_animation.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn alloc_task(&self) -> TaskHandle {
        TaskHandle(self.next_task.fetch_add(1, Ordering::Relaxed))
    }
}

static GLOBAL_IDS: IdAllocator = IdAllocator::new();

/// Process-wide animation id source.
pub(crate) fn next_animation_id() -> AnimationId {
    GLOBAL_IDS.alloc_animation()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_monotonic() {
        let alloc = IdAllocator::new();
        assert_eq!(alloc.alloc_animation(), AnimationId(0));
        assert_eq!(alloc.alloc_animation(), AnimationId(1));
        assert_eq!(alloc.alloc_task(), TaskHandle(0));
        assert_eq!(alloc.alloc_task(), TaskHandle(1));
    }

    #[test]
    fn global_ids_are_unique() {
        let a = next_animation_id();
        let b = next_animation_id();
        assert_ne!(a, b);
    }
}
