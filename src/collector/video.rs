//! Video collector
//!
//! Tracks the furthest playback position reached and classifies seeks,
//! playback-rate and volume changes.

use super::rounded_percent;
use crate::config::EngineConfig;
use crate::event::EventDetails;

/// Thresholds the video collector applies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoThresholds {
    pub seek_threshold_s: f64,
    pub watch_progress_min_percent: u32,
}

impl Default for VideoThresholds {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for VideoThresholds {
    fn from(config: &EngineConfig) -> Self {
        Self {
            seek_threshold_s: config.seek_threshold_s,
            watch_progress_min_percent: config.watch_progress_min_percent,
        }
    }
}

/// Running state for one video session
#[derive(Debug, Clone)]
pub struct VideoCollector {
    thresholds: VideoThresholds,
    max_playback_percent: u32,
    /// Position at the last time update; reference point for seeks
    last_known_time: f64,
}

impl VideoCollector {
    pub fn new(thresholds: VideoThresholds) -> Self {
        Self {
            thresholds,
            max_playback_percent: 0,
            last_known_time: 0.0,
        }
    }

    pub fn max_playback_percent(&self) -> u32 {
        self.max_playback_percent
    }

    pub fn last_known_time(&self) -> f64 {
        self.last_known_time
    }

    /// Playback position update
    pub fn on_time_update(&mut self, current_time: f64, duration: f64) {
        if let Some(percent) = rounded_percent(current_time, duration) {
            self.max_playback_percent = self.max_playback_percent.max(percent);
        }
        self.last_known_time = current_time;
    }

    /// Seek started towards `target_time`
    pub fn on_seeking(&self, target_time: f64) -> Option<EventDetails> {
        let from = self.last_known_time;
        if (target_time - from).abs() <= self.thresholds.seek_threshold_s {
            return None;
        }

        let seek_from_s = whole_seconds(from);
        let seek_to_s = whole_seconds(target_time);
        if target_time < from {
            Some(EventDetails::VideoRewind {
                seek_from_s,
                seek_to_s,
            })
        } else {
            Some(EventDetails::VideoSeekForward {
                seek_from_s,
                seek_to_s,
            })
        }
    }

    pub fn on_rate_change(&self, playback_rate: f64) -> EventDetails {
        EventDetails::VideoRateChange { playback_rate }
    }

    pub fn on_volume_change(&self, volume: f64, muted: bool) -> EventDetails {
        EventDetails::VideoVolumeChange { volume, muted }
    }

    /// Session-summary events; consumes the collector
    pub fn finish(self) -> Vec<EventDetails> {
        if self.max_playback_percent > self.thresholds.watch_progress_min_percent {
            vec![EventDetails::VideoWatchProgress {
                watch_percent: self.max_playback_percent,
            }]
        } else {
            Vec::new()
        }
    }
}

fn whole_seconds(seconds: f64) -> u64 {
    seconds.round().max(0.0) as u64
}
