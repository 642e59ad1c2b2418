//! Engine configuration
//!
//! Every threshold the collectors, session controller and profile store apply
//! lives here. Defaults are the production values; a JSON file may override any
//! subset of them.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Fixed record key of the persisted profile
pub const DEFAULT_PROFILE_KEY: &str = "nexusPersonaleProfile";

/// Maximum number of events retained in the interaction history
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Tunable thresholds and limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interaction history capacity (oldest evicted first)
    pub history_limit: usize,
    /// Sessions shorter than this emit `quick_exit`
    pub quick_exit_ms: i64,
    /// Minimum visible dwell on an element before `dwell_on_element` fires
    pub element_dwell_ms: i64,
    /// Intersection ratio at which an element counts as visible
    pub visibility_ratio: f64,
    /// `scroll_depth` is only reported above this percentage
    pub scroll_depth_min_percent: u32,
    /// Depth that arms bounce detection
    pub bounce_depth_percent: u32,
    /// Scroll offset (px) considered "back at the top"
    pub bounce_top_px: f64,
    /// Selections must be longer than this many UTF-16 code units (after trimming)
    pub selection_min_chars: usize,
    /// Seeks shorter than this (seconds) are treated as playback jitter
    pub seek_threshold_s: f64,
    /// `video_watch_progress` is only reported above this percentage
    pub watch_progress_min_percent: u32,
    /// Storage record key
    pub profile_key: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            quick_exit_ms: 3_000,
            element_dwell_ms: 2_000,
            visibility_ratio: 0.8,
            scroll_depth_min_percent: 10,
            bounce_depth_percent: 95,
            bounce_top_px: 50.0,
            selection_min_chars: 5,
            seek_threshold_s: 2.0,
            watch_progress_min_percent: 5,
            profile_key: DEFAULT_PROFILE_KEY.to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    /// Reject values no collector can work with
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.history_limit == 0 {
            return Err(EngineError::Config(
                "history_limit must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.visibility_ratio) {
            return Err(EngineError::Config(format!(
                "visibility_ratio must be within [0, 1], got {}",
                self.visibility_ratio
            )));
        }
        if self.quick_exit_ms < 0 || self.element_dwell_ms < 0 {
            return Err(EngineError::Config(
                "durations must not be negative".to_string(),
            ));
        }
        if self.profile_key.trim().is_empty() {
            return Err(EngineError::Config("profile_key is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "history_limit": 20 }"#).unwrap();
        assert_eq!(config.history_limit, 20);
        assert_eq!(config.quick_exit_ms, 3_000);
        assert_eq!(config.profile_key, DEFAULT_PROFILE_KEY);
    }

    #[test]
    fn test_rejects_zero_history() {
        let result = EngineConfig::from_json(r#"{ "history_limit": 0 }"#);
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_rejects_ratio_out_of_range() {
        let result = EngineConfig::from_json(r#"{ "visibility_ratio": 1.5 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = EngineConfig::load(Path::new("/nonexistent/nexus.json"));
        assert!(matches!(result, Err(EngineError::Config(_))));
    }
}
