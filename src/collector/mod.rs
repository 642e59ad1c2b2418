//! Signal collectors
//!
//! Per-medium state machines that turn raw, continuous UI telemetry into
//! discrete interaction events. Each collector exposes `on_*` methods for raw
//! samples, returning immediate events as they occur, and a consuming
//! `finish` that yields the session-summary events.
//!
//! Collectors know nothing about items or timestamps of recorded events; the
//! session controller wraps their output into [`NewEvent`](crate::event::NewEvent)s.

mod article;
mod video;

pub use article::{ArticleCollector, ArticleThresholds, ObservedElement, ScrollSample, Viewport};
pub use video::{VideoCollector, VideoThresholds};

use crate::event::{EventDetails, MediaSource};

/// Media load failure, reported for any medium
pub fn load_error(source: MediaSource) -> EventDetails {
    EventDetails::LoadError {
        error_source: source,
    }
}

/// `round(part / whole * 100)`, or `None` when `whole` is not positive
pub(crate) fn rounded_percent(part: f64, whole: f64) -> Option<u32> {
    if whole.is_nan() || whole <= 0.0 {
        return None;
    }
    let percent = (part / whole * 100.0).round();
    if percent.is_finite() {
        Some(percent.max(0.0) as u32)
    } else {
        None
    }
}
