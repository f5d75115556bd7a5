//! The validated input bundle of one animator.

use std::sync::Arc;

use crate::config::Config;
use crate::error::AnimationError;
use crate::position::Cuboid;
use crate::structure::{ActionCause, ActionType, AnimationType, PlayerRef, StructureSnapshot};

/// Everything one [`crate::Animator`] needs to know about a toggle request.
/// Constructed once through [`AnimationRequestData::builder`]; never mutated.
#[derive(Clone, Debug)]
pub struct AnimationRequestData {
    snapshot: Arc<StructureSnapshot>,
    cause: ActionCause,
    responsible: Option<PlayerRef>,
    action_type: ActionType,
    animation_type: AnimationType,
    animation_time: f64,
    skip_animation: bool,
    new_cuboid: Cuboid,
    perpetual: bool,
}

impl AnimationRequestData {
    pub fn builder(snapshot: impl Into<Arc<StructureSnapshot>>) -> AnimationRequestBuilder {
        let snapshot = snapshot.into();
        AnimationRequestBuilder {
            new_cuboid: snapshot.cuboid,
            perpetual: snapshot.kind.is_perpetual_capable(),
            snapshot,
            cause: ActionCause::default(),
            responsible: None,
            action_type: ActionType::default(),
            animation_type: AnimationType::default(),
            animation_time: 1.0,
            skip_animation: false,
        }
    }

    #[inline]
    pub fn snapshot(&self) -> &Arc<StructureSnapshot> {
        &self.snapshot
    }

    #[inline]
    pub fn cause(&self) -> ActionCause {
        self.cause
    }

    #[inline]
    pub fn responsible(&self) -> Option<&PlayerRef> {
        self.responsible.as_ref()
    }

    #[inline]
    pub fn action_type(&self) -> ActionType {
        self.action_type
    }

    #[inline]
    pub fn animation_type(&self) -> AnimationType {
        self.animation_type
    }

    /// Requested animation time in seconds.
    #[inline]
    pub fn animation_time(&self) -> f64 {
        self.animation_time
    }

    #[inline]
    pub fn skip_animation(&self) -> bool {
        self.skip_animation
    }

    /// Cuboid the structure occupies once the animation is done.
    #[inline]
    pub fn new_cuboid(&self) -> Cuboid {
        self.new_cuboid
    }

    #[inline]
    pub fn is_perpetual(&self) -> bool {
        self.perpetual
    }

    /// Animation length in host ticks.
    pub fn duration_ticks(&self, cfg: &Config) -> u32 {
        cfg.ticks_for(self.animation_time)
    }
}

/// Builder for [`AnimationRequestData`].
#[derive(Clone, Debug)]
pub struct AnimationRequestBuilder {
    snapshot: Arc<StructureSnapshot>,
    cause: ActionCause,
    responsible: Option<PlayerRef>,
    action_type: ActionType,
    animation_type: AnimationType,
    animation_time: f64,
    skip_animation: bool,
    new_cuboid: Cuboid,
    perpetual: bool,
}

impl AnimationRequestBuilder {
    pub fn cause(mut self, cause: ActionCause) -> Self {
        self.cause = cause;
        self
    }

    pub fn responsible(mut self, player: PlayerRef) -> Self {
        self.responsible = Some(player);
        self
    }

    pub fn action_type(mut self, action_type: ActionType) -> Self {
        self.action_type = action_type;
        self
    }

    pub fn animation_type(mut self, animation_type: AnimationType) -> Self {
        self.animation_type = animation_type;
        self
    }

    pub fn animation_time(mut self, seconds: f64) -> Self {
        self.animation_time = seconds;
        self
    }

    pub fn skip_animation(mut self, skip: bool) -> Self {
        self.skip_animation = skip;
        self
    }

    pub fn new_cuboid(mut self, cuboid: Cuboid) -> Self {
        self.new_cuboid = cuboid;
        self
    }

    pub fn perpetual(mut self, perpetual: bool) -> Self {
        self.perpetual = perpetual;
        self
    }

    pub fn build(self) -> Result<AnimationRequestData, AnimationError> {
        if !self.skip_animation && !(self.animation_time.is_finite() && self.animation_time > 0.0) {
            return Err(AnimationError::InvalidRequest {
                reason: format!("animation time must be positive, got {}", self.animation_time),
            });
        }
        if self.perpetual && !self.snapshot.kind.is_perpetual_capable() {
            return Err(AnimationError::InvalidRequest {
                reason: format!("{} animations cannot be perpetual", self.snapshot.kind.name()),
            });
        }
        Ok(AnimationRequestData {
            snapshot: self.snapshot,
            cause: self.cause,
            responsible: self.responsible,
            action_type: self.action_type,
            animation_type: self.animation_type,
            animation_time: self.animation_time,
            skip_animation: self.skip_animation,
            new_cuboid: self.new_cuboid,
            perpetual: self.perpetual,
        })
    }
}
