//! Error types for the animation engine

use crate::ids::{AnimationId, StructureId};

/// Errors raised by the engine and its collaborators.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum AnimationError {
    /// A main-thread-only operation was entered from another thread
    #[error("thread affinity violated: `{action}` must run on the main thread")]
    ThreadAffinity { action: String },

    /// The animator was asked to start a second time
    #[error("{animation} for {structure} was already started")]
    AlreadyStarted {
        animation: AnimationId,
        structure: StructureId,
    },

    /// An animation request failed validation
    #[error("invalid animation request: {reason}")]
    InvalidRequest { reason: String },

    /// A substitute block could not be created
    #[error("failed to create animated block at ({x}, {y}, {z})")]
    BlockCreation {
        x: i32,
        y: i32,
        z: i32,
        #[source]
        source: anyhow::Error,
    },

    /// The structure is larger than the configured limit
    #[error("structure has {count} blocks (limit: {limit})")]
    TooManyBlocks { count: usize, limit: usize },

    /// Moving a substitute block failed
    #[error("failed to move animated block from ({x}, {y}, {z})")]
    Movement {
        x: i32,
        y: i32,
        z: i32,
        #[source]
        source: anyhow::Error,
    },

    /// A hook failed at one of its call sites
    #[error("hook `{hook}` failed during `{action}`: {reason}")]
    Hook {
        hook: String,
        action: &'static str,
        reason: String,
    },

    /// The engine config could not be parsed
    #[error("invalid config: {reason}")]
    Config { reason: String },

    /// A single animation step panicked
    #[error("animation step {tick} panicked: {message}")]
    StepPanicked { tick: u32, message: String },
}

impl AnimationError {
    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::ThreadAffinity { .. } | Self::AlreadyStarted { .. } => "invariant",
            Self::InvalidRequest { .. } | Self::Config { .. } => "config",
            Self::BlockCreation { .. } | Self::TooManyBlocks { .. } => "initialization",
            Self::Movement { .. } | Self::StepPanicked { .. } => "step",
            Self::Hook { .. } => "hook",
        }
    }

    /// Invariant violations are logic bugs in the caller, not runtime conditions.
    #[inline]
    pub fn is_invariant_violation(&self) -> bool {
        self.category() == "invariant"
    }
}

/// Render a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let err = AnimationError::ThreadAffinity {
            action: "put_blocks".into(),
        };
        assert!(err.is_invariant_violation());

        let err = AnimationError::Hook {
            hook: "sound".into(),
            action: "on_prepare",
            reason: "boom".into(),
        };
        assert_eq!(err.category(), "hook");
        assert_eq!(
            err.to_string(),
            "hook `sound` failed during `on_prepare`: boom"
        );
    }

    #[test]
    fn test_block_creation_keeps_source() {
        use std::error::Error as _;
        let err = AnimationError::BlockCreation {
            x: 1,
            y: 2,
            z: 3,
            source: anyhow::anyhow!("chunk not loaded"),
        };
        assert_eq!(err.to_string(), "failed to create animated block at (1, 2, 3)");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
