//! Interaction event model
//!
//! Every event carries exactly one item reference and a detail payload whose
//! shape is fixed by its event type. The payload is a tagged union so an event
//! type can never carry another type's fields.
//!
//! Wire shape: `{timestamp, itemId, itemType, eventType, details: {...}}`.

use crate::types::{ContentItem, ItemType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of interaction event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    View,
    Like,
    QuickExit,
    TotalDwellTime,
    ScrollDepth,
    ScrollBounce,
    AvgScrollSpeed,
    DwellOnElement,
    TextSelection,
    /// Reserved; no collector emits it
    VideoPause,
    VideoWatchProgress,
    VideoRewind,
    VideoSeekForward,
    VideoRateChange,
    VideoVolumeChange,
    LoadError,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::View => "view",
            EventType::Like => "like",
            EventType::QuickExit => "quick_exit",
            EventType::TotalDwellTime => "total_dwell_time",
            EventType::ScrollDepth => "scroll_depth",
            EventType::ScrollBounce => "scroll_bounce",
            EventType::AvgScrollSpeed => "avg_scroll_speed",
            EventType::DwellOnElement => "dwell_on_element",
            EventType::TextSelection => "text_selection",
            EventType::VideoPause => "video_pause",
            EventType::VideoWatchProgress => "video_watch_progress",
            EventType::VideoRewind => "video_rewind",
            EventType::VideoSeekForward => "video_seek_forward",
            EventType::VideoRateChange => "video_rate_change",
            EventType::VideoVolumeChange => "video_volume_change",
            EventType::LoadError => "load_error",
        }
    }

    /// Summary events are only derivable once a session ends
    pub fn is_summary(&self) -> bool {
        matches!(
            self,
            EventType::QuickExit
                | EventType::TotalDwellTime
                | EventType::ScrollDepth
                | EventType::ScrollBounce
                | EventType::AvgScrollSpeed
                | EventType::VideoWatchProgress
        )
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Element whose media failed to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaSource {
    Img,
    Video,
}

/// Event payload, keyed by event type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "eventType",
    content = "details",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum EventDetails {
    View {},
    Like {},
    QuickExit {
        duration_ms: u64,
    },
    TotalDwellTime {
        duration_ms: u64,
    },
    ScrollDepth {
        scroll_percent: u32,
    },
    ScrollBounce {},
    AvgScrollSpeed {
        /// Pixels per second
        speed_pxs: u64,
    },
    DwellOnElement {
        duration_ms: u64,
        element_tag: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        element_id: Option<String>,
    },
    TextSelection {
        selected_text: String,
    },
    VideoPause {
        pause_time_s: f64,
    },
    VideoWatchProgress {
        watch_percent: u32,
    },
    VideoRewind {
        seek_from_s: u64,
        seek_to_s: u64,
    },
    VideoSeekForward {
        seek_from_s: u64,
        seek_to_s: u64,
    },
    VideoRateChange {
        playback_rate: f64,
    },
    VideoVolumeChange {
        volume: f64,
        muted: bool,
    },
    LoadError {
        error_source: MediaSource,
    },
}

impl EventDetails {
    pub fn event_type(&self) -> EventType {
        match self {
            EventDetails::View {} => EventType::View,
            EventDetails::Like {} => EventType::Like,
            EventDetails::QuickExit { .. } => EventType::QuickExit,
            EventDetails::TotalDwellTime { .. } => EventType::TotalDwellTime,
            EventDetails::ScrollDepth { .. } => EventType::ScrollDepth,
            EventDetails::ScrollBounce {} => EventType::ScrollBounce,
            EventDetails::AvgScrollSpeed { .. } => EventType::AvgScrollSpeed,
            EventDetails::DwellOnElement { .. } => EventType::DwellOnElement,
            EventDetails::TextSelection { .. } => EventType::TextSelection,
            EventDetails::VideoPause { .. } => EventType::VideoPause,
            EventDetails::VideoWatchProgress { .. } => EventType::VideoWatchProgress,
            EventDetails::VideoRewind { .. } => EventType::VideoRewind,
            EventDetails::VideoSeekForward { .. } => EventType::VideoSeekForward,
            EventDetails::VideoRateChange { .. } => EventType::VideoRateChange,
            EventDetails::VideoVolumeChange { .. } => EventType::VideoVolumeChange,
            EventDetails::LoadError { .. } => EventType::LoadError,
        }
    }
}

/// An event before the store stamps it
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub item_id: String,
    pub item_type: ItemType,
    pub details: EventDetails,
}

impl NewEvent {
    pub fn new(item_id: impl Into<String>, item_type: ItemType, details: EventDetails) -> Self {
        Self {
            item_id: item_id.into(),
            item_type,
            details,
        }
    }

    pub fn for_item(item: &ContentItem, details: EventDetails) -> Self {
        Self::new(item.id.clone(), item.item_type, details)
    }

    pub fn event_type(&self) -> EventType {
        self.details.event_type()
    }

    /// Stamp the event
    pub fn at(self, timestamp: DateTime<Utc>) -> InteractionEvent {
        InteractionEvent {
            timestamp,
            item_id: self.item_id,
            item_type: self.item_type,
            details: self.details,
        }
    }
}

/// A recorded interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEvent {
    pub timestamp: DateTime<Utc>,
    pub item_id: String,
    pub item_type: ItemType,
    #[serde(flatten)]
    pub details: EventDetails,
}

impl InteractionEvent {
    pub fn event_type(&self) -> EventType {
        self.details.event_type()
    }
}
