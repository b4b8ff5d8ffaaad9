//! Timeline configuration.
//!
//! [`TimelineConfig`] is plain serde data so hosts can keep it next to their
//! other settings. Every field has a default; a JSON document only needs to
//! name the values it overrides.
//!
//! ```
//! use rewind_engine::config::TimelineConfig;
//!
//! let config = TimelineConfig::from_json(r#"{ "max_record_duration": 10.0 }"#).unwrap();
//! assert_eq!(config.max_record_duration, 10.0);
//! assert_eq!(config.predicted_fps(), 144);
//! ```

use std::path::Path;

use rewind_core::frame::FrameCapacity;
use rewind_core::RewindError;
use serde::{Deserialize, Serialize};

/// Settings for a [`Timeline`](crate::timeline::Timeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Seconds of history to retain. Older frames are evicted.
    pub max_record_duration: f64,
    /// Frame rate the host targets, if it caps one.
    pub target_fps: Option<u32>,
    /// Worst-case frame rate assumed when no target is set.
    pub max_fps: u32,
    /// Delta used by [`Timeline::tick_fixed`](crate::timeline::Timeline::tick_fixed).
    pub fixed_dt: f64,
    /// Whether loading a scene in single mode clears all history.
    pub clear_on_scene_load: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            max_record_duration: 30.0,
            target_fps: None,
            max_fps: 144,
            fixed_dt: 1.0 / 60.0,
            clear_on_scene_load: true,
        }
    }
}

impl TimelineConfig {
    /// The frame rate used for capacity prediction: the target if one is
    /// set, else the worst case.
    pub fn predicted_fps(&self) -> u32 {
        self.target_fps
            .filter(|&fps| fps > 0)
            .unwrap_or(self.max_fps)
    }

    /// Sizing hint handed to the clock and the snapshot pools.
    pub fn capacity(&self) -> FrameCapacity {
        FrameCapacity {
            max_record_duration: self.max_record_duration,
            predicted_fps: self.predicted_fps(),
        }
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> Result<(), RewindError> {
        if !(self.max_record_duration > 0.0 && self.max_record_duration.is_finite()) {
            return Err(RewindError::InvalidConfig {
                reason: format!(
                    "max_record_duration must be positive and finite, got {}",
                    self.max_record_duration
                ),
            });
        }
        if !(self.fixed_dt > 0.0 && self.fixed_dt.is_finite()) {
            return Err(RewindError::InvalidConfig {
                reason: format!("fixed_dt must be positive and finite, got {}", self.fixed_dt),
            });
        }
        if self.max_fps == 0 {
            return Err(RewindError::InvalidConfig {
                reason: "max_fps must be at least 1".to_owned(),
            });
        }
        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, anyhow::Error> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| anyhow::anyhow!("failed to parse timeline config: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("failed to read timeline config {}: {e}", path.display())
        })?;
        Self::from_json(&json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
