//! Raw UI signal records
//!
//! A record is one timestamped notification from the presentation layer: a
//! detail view opening or closing, a scroll, a selection, a visibility change,
//! a media element event. Replaying records in order through the engine
//! reproduces the interaction events the live UI would have recorded.

use crate::collector::{ObservedElement, Viewport};
use crate::error::SignalValidationError;
use crate::event::MediaSource;
use crate::session::CloseReason;
use crate::types::ItemType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_close_reason() -> CloseReason {
    CloseReason::CloseButton
}

/// One notification from the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "signal",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum UiSignal {
    /// A feed card was opened into its detail view
    Open { item_id: String, item_type: ItemType },
    /// The detail view was dismissed
    Close {
        #[serde(default = "default_close_reason")]
        reason: CloseReason,
    },
    /// Like control toggled on for a card
    Like { item_id: String, item_type: ItemType },
    Scroll {
        scroll_top: f64,
        scroll_height: f64,
        client_height: f64,
    },
    /// Pointer released; `selection` is the current text selection
    PointerUp {
        #[serde(default)]
        selection: String,
    },
    /// Intersection ratio of an observed article element changed
    Visibility {
        index: usize,
        tag: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        ratio: f64,
    },
    TimeUpdate { current_time: f64, duration: f64 },
    Seeking { target_time: f64 },
    RateChange { playback_rate: f64 },
    VolumeChange { volume: f64, muted: bool },
    LoadError { source: MediaSource },
}

impl UiSignal {
    pub fn name(&self) -> &'static str {
        match self {
            UiSignal::Open { .. } => "open",
            UiSignal::Close { .. } => "close",
            UiSignal::Like { .. } => "like",
            UiSignal::Scroll { .. } => "scroll",
            UiSignal::PointerUp { .. } => "pointer_up",
            UiSignal::Visibility { .. } => "visibility",
            UiSignal::TimeUpdate { .. } => "time_update",
            UiSignal::Seeking { .. } => "seeking",
            UiSignal::RateChange { .. } => "rate_change",
            UiSignal::VolumeChange { .. } => "volume_change",
            UiSignal::LoadError { .. } => "load_error",
        }
    }

    /// Viewport geometry carried by a scroll signal
    pub fn viewport(&self) -> Option<Viewport> {
        match *self {
            UiSignal::Scroll {
                scroll_top,
                scroll_height,
                client_height,
            } => Some(Viewport {
                scroll_top,
                scroll_height,
                client_height,
            }),
            _ => None,
        }
    }

    /// Element carried by a visibility signal
    pub fn element(&self) -> Option<ObservedElement> {
        match self {
            UiSignal::Visibility { index, tag, id, .. } => {
                let element = ObservedElement::new(*index, tag.clone());
                Some(match id {
                    Some(id) => element.with_id(id.clone()),
                    None => element,
                })
            }
            _ => None,
        }
    }

    /// Check the signal's own fields
    pub fn validate(&self) -> Result<(), SignalValidationError> {
        match self {
            UiSignal::Open { item_id, .. } | UiSignal::Like { item_id, .. } => {
                if item_id.trim().is_empty() {
                    return Err(SignalValidationError::EmptyId("itemId"));
                }
            }
            UiSignal::Scroll {
                scroll_top,
                scroll_height,
                client_height,
            } => {
                non_negative("scrollTop", *scroll_top)?;
                non_negative("scrollHeight", *scroll_height)?;
                non_negative("clientHeight", *client_height)?;
            }
            UiSignal::Visibility { tag, ratio, .. } => {
                if tag.trim().is_empty() {
                    return Err(SignalValidationError::EmptyId("tag"));
                }
                if !(0.0..=1.0).contains(ratio) {
                    return Err(SignalValidationError::RatioOutOfRange(*ratio));
                }
            }
            UiSignal::TimeUpdate {
                current_time,
                duration,
            } => {
                non_negative("currentTime", *current_time)?;
                non_negative("duration", *duration)?;
            }
            UiSignal::Seeking { target_time } => non_negative("targetTime", *target_time)?,
            UiSignal::RateChange { playback_rate } => {
                non_negative("playbackRate", *playback_rate)?
            }
            UiSignal::VolumeChange { volume, .. } => non_negative("volume", *volume)?,
            UiSignal::Close { .. } | UiSignal::PointerUp { .. } | UiSignal::LoadError { .. } => {}
        }
        Ok(())
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), SignalValidationError> {
    if value.is_nan() || value < 0.0 {
        Err(SignalValidationError::NegativeValue { field, value })
    } else {
        Ok(())
    }
}

/// A signal and the instant it was observed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub signal: UiSignal,
}

impl SignalRecord {
    pub fn new(at: DateTime<Utc>, signal: UiSignal) -> Self {
        Self { at, signal }
    }
}
