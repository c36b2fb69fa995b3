//! Session settings.
//!
//! DESIGN
//! ======
//! Settings are plain data owned by the editing session. Hosts may persist
//! them as camelCase JSON; missing fields fall back to their defaults, and
//! out-of-range values are rejected rather than clamped so that a corrupt
//! settings blob is noticed.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

use crate::consts::{GRID_SIZE, HISTORY_CAPACITY, MAX_PLAYBACK_SPEED, MIN_PLAYBACK_SPEED, SNAP_RADIUS};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Grid spacing in canvas units; also the export length unit.
    pub grid_size: f64,
    /// Canvas-unit radius for reusing an existing anchor on placement.
    pub snap_radius: f64,
    pub snap_to_grid: bool,
    pub snap_to_vertices: bool,
    pub show_grid: bool,
    pub show_vertices: bool,
    /// Draw the bounding box that export would normalize against.
    pub show_export_bounds: bool,
    pub playback_speed: f64,
    pub history_capacity: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE,
            snap_radius: SNAP_RADIUS,
            snap_to_grid: false,
            snap_to_vertices: true,
            show_grid: true,
            show_vertices: true,
            show_export_bounds: false,
            playback_speed: 1.0,
            history_capacity: HISTORY_CAPACITY,
        }
    }
}

impl EditorConfig {
    /// Parse and validate settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for unparseable input and
    /// [`ConfigError::Invalid`] when a value is out of range.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns the serializer's error.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.grid_size.is_finite() && self.grid_size > 0.0) {
            return Err(ConfigError::Invalid(format!("gridSize must be positive, got {}", self.grid_size)));
        }
        if !(self.snap_radius.is_finite() && self.snap_radius >= 0.0) {
            return Err(ConfigError::Invalid(format!("snapRadius must be non-negative, got {}", self.snap_radius)));
        }
        if !(MIN_PLAYBACK_SPEED..=MAX_PLAYBACK_SPEED).contains(&self.playback_speed) {
            return Err(ConfigError::Invalid(format!(
                "playbackSpeed must be within [{MIN_PLAYBACK_SPEED}, {MAX_PLAYBACK_SPEED}], got {}",
                self.playback_speed
            )));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid("historyCapacity must be at least 1".to_string()));
        }
        Ok(())
    }
}
