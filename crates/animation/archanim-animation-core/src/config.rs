//! Core configuration for archanim-animation-core.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AnimationError;

/// Timing and sizing knobs shared by every animator of one host.
/// Keep this minimal; expand as needed without breaking API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Duration of one host tick in milliseconds. Step period and animation
    /// duration conversions derive from it.
    pub server_tick_time_ms: u64,
    /// Delay before the first animation step so substitute entities can render.
    pub start_delay_ms: u64,
    /// Grace ticks spent snapping blocks to their final position before a
    /// non-perpetual animation stops.
    pub finish_duration_ticks: u32,
    /// Delay of the best-effort redstone re-check after completion.
    pub redstone_verification_delay_ms: u64,
    /// Upper bound on substitute blocks per animation. `None` disables the check.
    pub max_animated_blocks: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_tick_time_ms: 50,
            start_delay_ms: 700,
            finish_duration_ticks: 5,
            redstone_verification_delay_ms: 1000,
            max_animated_blocks: None,
        }
    }
}

impl Config {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, AnimationError> {
        serde_json::from_str(json).map_err(|e| AnimationError::Config {
            reason: e.to_string(),
        })
    }

    #[inline]
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.server_tick_time_ms.max(1))
    }

    #[inline]
    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    #[inline]
    pub fn redstone_verification_delay(&self) -> Duration {
        Duration::from_millis(self.redstone_verification_delay_ms)
    }

    /// Number of ticks an animation of `seconds` takes; never less than one.
    pub fn ticks_for(&self, seconds: f64) -> u32 {
        let tick_ms = self.server_tick_time_ms.max(1) as f64;
        let ticks = (seconds * 1000.0 / tick_ms).round();
        if ticks.is_finite() && ticks >= 1.0 {
            ticks.min(u32::MAX as f64) as u32
        } else {
            1
        }
    }
}
