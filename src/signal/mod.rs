//! Raw UI signal input
//!
//! The presentation layer's notifications as replayable records, plus the
//! trace container used by the replay entry points.

mod record;
mod trace;

pub use record::{SignalRecord, UiSignal};
pub use trace::{SignalTrace, ValidationIssue};
