//! Engine orchestration
//!
//! This module provides the public API for Nexus Flux. [`FeedEngine`] wires
//! the feed, the session controller and the profile store together for a live
//! UI; [`replay_trace`] runs a recorded signal trace through the same path and
//! reports the resulting profile.

use crate::clock::{Clock, ManualClock};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::event::InteractionEvent;
use crate::feed::Feed;
use crate::profile::{MemoryStorage, ProfileStore};
use crate::ranking::ContentGenerator;
use crate::session::{CloseReason, SessionController, SessionSummary};
use crate::signal::{SignalTrace, UiSignal};
use crate::types::UserProfile;
use chrono::Utc;
use log::{debug, info};
use serde::Serialize;

/// Apply one raw signal to a session controller.
///
/// Returns every event recorded as a consequence, in recording order, plus
/// the summary of any session the signal closed.
pub(crate) fn apply_signal(
    session: &mut SessionController,
    signal: &UiSignal,
) -> (Vec<InteractionEvent>, Option<SessionSummary>) {
    let mut recorded = Vec::new();
    let mut closed = None;

    match signal {
        UiSignal::Open { item_id, item_type } => {
            // Close explicitly so the replaced session's summary is reported
            if let Some(summary) = session.close(CloseReason::Replaced) {
                recorded.extend(summary.events.iter().cloned());
                closed = Some(summary);
            }
            recorded.push(session.open(item_id.clone(), *item_type));
        }
        UiSignal::Close { reason } => {
            if let Some(summary) = session.close(*reason) {
                recorded.extend(summary.events.iter().cloned());
                closed = Some(summary);
            } else {
                debug!("Ignoring close with no open session");
            }
        }
        UiSignal::Like { item_id, item_type } => {
            recorded.push(session.like(item_id.clone(), *item_type));
        }
        UiSignal::Scroll { .. } => {
            if let Some(viewport) = signal.viewport() {
                session.on_scroll(viewport);
            }
        }
        UiSignal::PointerUp { selection } => recorded.extend(session.on_pointer_up(selection)),
        UiSignal::Visibility { ratio, .. } => {
            if let Some(element) = signal.element() {
                recorded.extend(session.on_visibility(&element, *ratio));
            }
        }
        UiSignal::TimeUpdate {
            current_time,
            duration,
        } => session.on_time_update(*current_time, *duration),
        UiSignal::Seeking { target_time } => recorded.extend(session.on_seeking(*target_time)),
        UiSignal::RateChange { playback_rate } => {
            recorded.extend(session.on_rate_change(*playback_rate))
        }
        UiSignal::VolumeChange { volume, muted } => {
            recorded.extend(session.on_volume_change(*volume, *muted))
        }
        UiSignal::LoadError { source } => recorded.extend(session.on_load_error(*source)),
    }

    (recorded, closed)
}

/// Live engine: the displayed feed plus the session lifecycle over one store
pub struct FeedEngine {
    session: SessionController,
    feed: Feed,
    generator: Box<dyn ContentGenerator>,
}

impl FeedEngine {
    pub fn new(
        store: ProfileStore,
        config: EngineConfig,
        generator: Box<dyn ContentGenerator>,
    ) -> Self {
        Self {
            session: SessionController::new(store, config),
            feed: Feed::new(),
            generator,
        }
    }

    /// Leave the welcome screen and fetch the first batch
    pub fn start(&mut self) {
        self.feed.dismiss_welcome();
        self.regenerate();
    }

    /// Fetch a fresh batch for the current profile
    pub fn regenerate(&mut self) {
        let profile = self.session.store().snapshot();
        self.feed.refresh(self.generator.as_ref(), &profile);
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn profile(&self) -> &UserProfile {
        self.session.store().profile()
    }

    /// Whether the welcome screen should be shown
    pub fn shows_welcome(&self) -> bool {
        self.feed
            .shows_welcome(self.session.store().has_interacted())
    }

    /// Open a feed item's detail view
    pub fn open(&mut self, item_id: &str) -> Result<InteractionEvent, EngineError> {
        let item = self
            .feed
            .item(item_id)
            .ok_or_else(|| EngineError::UnknownItem(item_id.to_string()))?;
        let item_type = item.item_type;
        if let Some(summary) = self.session.close(CloseReason::Replaced) {
            debug!("Replaced open session for {}", summary.item_id);
        }
        Ok(self.session.open(item_id.to_string(), item_type))
    }

    pub fn close(&mut self, reason: CloseReason) -> Option<SessionSummary> {
        self.session.close(reason)
    }

    /// Toggle a card's like control. Records a `like` only when the card
    /// becomes liked.
    pub fn like(&mut self, item_id: &str) -> Result<Option<InteractionEvent>, EngineError> {
        if self.feed.item(item_id).is_none() {
            return Err(EngineError::UnknownItem(item_id.to_string()));
        }
        Ok(self
            .feed
            .toggle_like(item_id)
            .map(|event| self.session.store_mut().record(event)))
    }

    /// Route a raw UI signal, returning the events it recorded.
    ///
    /// A `like` signal only turns a card's like control on. A card that is
    /// already liked stays liked and the signal is recorded as on replay.
    pub fn apply(&mut self, signal: &UiSignal) -> Vec<InteractionEvent> {
        if let UiSignal::Like { item_id, .. } = signal {
            let unliked = self.feed.item(item_id).is_some_and(|item| !item.is_liked);
            if unliked {
                return self.like(item_id).ok().flatten().into_iter().collect();
            }
        }
        apply_signal(&mut self.session, signal).0
    }
}

/// Result of replaying a trace
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayOutcome {
    /// Profile after the last record
    pub profile: UserProfile,
    /// Events recorded during the replay, in recording order
    pub recorded: Vec<InteractionEvent>,
    /// Sessions closed during the replay
    pub sessions: Vec<SessionSummary>,
}

/// Replay a signal trace over an optional starting profile.
///
/// Each record's `at` is the clock for everything it triggers. A session
/// still open after the last record is closed at that record's instant. A
/// starting profile that cannot be parsed is discarded, as on a normal load.
///
/// # Example
/// ```ignore
/// let outcome = replay_trace(trace_ndjson, None, &EngineConfig::default())?;
/// println!("{}", serde_json::to_string(&outcome.profile)?);
/// ```
pub fn replay_trace(
    trace_json: &str,
    profile_json: Option<&str>,
    config: &EngineConfig,
) -> Result<ReplayOutcome, EngineError> {
    config.validate()?;
    let trace = SignalTrace::parse(trace_json)?;
    trace.ensure_valid()?;

    let start = trace.records().first().map(|r| r.at).unwrap_or_else(Utc::now);
    let clock = ManualClock::new(start);

    let storage = match profile_json {
        Some(json) => MemoryStorage::with_record(config.profile_key.clone(), json),
        None => MemoryStorage::new(),
    };
    let store = ProfileStore::load(Box::new(storage), Box::new(clock.clone()), config);
    let mut session = SessionController::new(store, config.clone());

    let mut recorded = Vec::new();
    let mut sessions = Vec::new();

    for record in trace.records() {
        clock.set(record.at);
        let (events, closed) = apply_signal(&mut session, &record.signal);
        recorded.extend(events);
        sessions.extend(closed);
    }

    if let Some(summary) = session.close(CloseReason::CloseButton) {
        debug!(
            "Closed trailing session for {} at {}",
            summary.item_id,
            clock.now()
        );
        recorded.extend(summary.events.iter().cloned());
        sessions.push(summary);
    }

    info!(
        "Replayed {} signals into {} events across {} sessions",
        trace.len(),
        recorded.len(),
        sessions.len()
    );

    Ok(ReplayOutcome {
        profile: session.into_store().snapshot(),
        recorded,
        sessions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::event::{EventDetails, EventType};
    use crate::types::{ContentItem, ItemType};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn sample_trace() -> &'static str {
        r#"
{"at":"2024-01-15T14:00:00Z","signal":"open","itemId":"v1","itemType":"video"}
{"at":"2024-01-15T14:00:01Z","signal":"time_update","currentTime":10,"duration":100}
{"at":"2024-01-15T14:00:02Z","signal":"seeking","targetTime":4}
{"at":"2024-01-15T14:00:03Z","signal":"time_update","currentTime":30,"duration":100}
{"at":"2024-01-15T14:00:08Z","signal":"close","reason":"escape"}
{"at":"2024-01-15T14:00:09Z","signal":"like","itemId":"q1","itemType":"quote"}
"#
    }

    fn event_types(events: &[InteractionEvent]) -> Vec<EventType> {
        events.iter().map(|e| e.event_type()).collect()
    }

    #[test]
    fn test_replay_video_trace() {
        let outcome = replay_trace(sample_trace(), None, &EngineConfig::default()).unwrap();

        assert_eq!(
            event_types(&outcome.recorded),
            vec![
                EventType::View,
                EventType::VideoRewind,
                EventType::TotalDwellTime,
                EventType::VideoWatchProgress,
                EventType::Like,
            ]
        );
        assert_eq!(outcome.sessions.len(), 1);
        assert_eq!(outcome.sessions[0].reason, CloseReason::Escape);
        assert_eq!(outcome.sessions[0].duration_ms, 8000);

        assert_eq!(
            outcome.recorded[1].details,
            EventDetails::VideoRewind {
                seek_from_s: 10,
                seek_to_s: 4
            }
        );
        assert_eq!(
            outcome.recorded[3].details,
            EventDetails::VideoWatchProgress { watch_percent: 30 }
        );

        assert!(outcome.profile.is_viewed("v1"));
        assert!(outcome.profile.is_liked("q1"));
        assert_eq!(outcome.profile.interaction_history.len(), 5);
    }

    #[test]
    fn test_replay_closes_trailing_session() {
        let trace = r#"[
            {"at":"2024-01-15T14:00:00Z","signal":"open","itemId":"p1","itemType":"podcast"},
            {"at":"2024-01-15T14:00:01Z","signal":"load_error","source":"img"}
        ]"#;
        let outcome = replay_trace(trace, None, &EngineConfig::default()).unwrap();

        assert_eq!(
            event_types(&outcome.recorded),
            vec![
                EventType::View,
                EventType::LoadError,
                EventType::TotalDwellTime,
                EventType::QuickExit,
            ]
        );
        assert_eq!(outcome.sessions[0].duration_ms, 1000);
    }

    #[test]
    fn test_replay_opening_another_item_reports_replaced_session() {
        let trace = r#"
{"at":"2024-01-15T14:00:00Z","signal":"open","itemId":"q1","itemType":"quote"}
{"at":"2024-01-15T14:00:04Z","signal":"open","itemId":"q2","itemType":"quote"}
{"at":"2024-01-15T14:00:10Z","signal":"close"}
"#;
        let outcome = replay_trace(trace, None, &EngineConfig::default()).unwrap();

        assert_eq!(outcome.sessions.len(), 2);
        assert_eq!(outcome.sessions[0].item_id, "q1");
        assert_eq!(outcome.sessions[0].reason, CloseReason::Replaced);
        assert_eq!(outcome.sessions[1].item_id, "q2");
        assert_eq!(outcome.sessions[1].duration_ms, 6000);
    }

    #[test]
    fn test_replay_extends_existing_profile() {
        let existing = r#"{
            "interactions": {"liked": ["old"], "viewed": ["old"]},
            "interactionHistory": [
                {"timestamp":"2024-01-14T09:00:00Z","itemId":"old","itemType":"article","eventType":"like","details":{}}
            ]
        }"#;
        let outcome =
            replay_trace(sample_trace(), Some(existing), &EngineConfig::default()).unwrap();

        assert_eq!(outcome.profile.interaction_history.len(), 6);
        assert!(outcome.profile.is_liked("old"));
        assert!(outcome.profile.is_liked("q1"));
    }

    #[test]
    fn test_replay_malformed_profile_starts_fresh() {
        let outcome =
            replay_trace(sample_trace(), Some("{not json"), &EngineConfig::default()).unwrap();
        assert_eq!(outcome.profile.interaction_history.len(), 5);
    }

    #[test]
    fn test_replay_rejects_invalid_trace() {
        let trace = r#"
{"at":"2024-01-15T14:00:05Z","signal":"open","itemId":"v1","itemType":"video"}
{"at":"2024-01-15T14:00:01Z","signal":"close"}
"#;
        let result = replay_trace(trace, None, &EngineConfig::default());
        assert!(matches!(result, Err(EngineError::InvalidSignal(_))));

        assert!(replay_trace("not json", None, &EngineConfig::default()).is_err());
    }

    #[test]
    fn test_replay_empty_trace() {
        let outcome = replay_trace("", None, &EngineConfig::default()).unwrap();
        assert!(outcome.recorded.is_empty());
        assert!(!outcome.profile.has_history());
    }

    fn quote(id: &str) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            item_type: ItemType::Quote,
            title: "t".to_string(),
            description: "d".to_string(),
            tags: vec![],
            image_url: "https://picsum.photos/seed/q/600/400".to_string(),
            is_liked: false,
            content: None,
            video_url: None,
        }
    }

    fn engine(clock: &ManualClock) -> FeedEngine {
        let config = EngineConfig::default();
        let store = ProfileStore::new(
            Box::new(MemoryStorage::new()),
            Box::new(clock.clone()),
            &config,
        );
        let generator = |_: &UserProfile| -> Result<Vec<ContentItem>, GenerationError> {
            Ok(vec![quote("q1"), quote("q2")])
        };
        FeedEngine::new(store, config, Box::new(generator))
    }

    #[test]
    fn test_engine_lifecycle() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap());
        let mut engine = engine(&clock);

        assert!(engine.shows_welcome());
        engine.start();
        assert!(!engine.shows_welcome());
        assert_eq!(engine.feed().items().len(), 2);

        let view = engine.open("q1").unwrap();
        assert_eq!(view.event_type(), EventType::View);
        assert_eq!(engine.session().open_item(), Some("q1"));

        clock.advance_ms(10_000);
        let summary = engine.close(CloseReason::OverlayClick).unwrap();
        assert_eq!(event_types(&summary.events), vec![EventType::TotalDwellTime]);

        assert!(matches!(
            engine.open("missing"),
            Err(EngineError::UnknownItem(_))
        ));
    }

    #[test]
    fn test_engine_like_toggle() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap());
        let mut engine = engine(&clock);
        engine.start();

        let liked = engine.like("q2").unwrap();
        assert!(liked.is_some());
        assert!(engine.profile().is_liked("q2"));

        // Unliking flips the card but records nothing
        assert!(engine.like("q2").unwrap().is_none());
        assert!(!engine.feed().item("q2").unwrap().is_liked);
        assert_eq!(engine.profile().interaction_history.len(), 1);

        // A like signal for a displayed card goes through the toggle
        let recorded = engine.apply(&UiSignal::Like {
            item_id: "q2".to_string(),
            item_type: ItemType::Quote,
        });
        assert_eq!(event_types(&recorded), vec![EventType::Like]);
        assert!(engine.feed().item("q2").unwrap().is_liked);
    }

    #[test]
    fn test_engine_repeated_like_signal_keeps_card_liked() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap());
        let mut engine = engine(&clock);
        engine.start();

        let like = UiSignal::Like {
            item_id: "q1".to_string(),
            item_type: ItemType::Quote,
        };
        assert_eq!(event_types(&engine.apply(&like)), vec![EventType::Like]);
        assert_eq!(event_types(&engine.apply(&like)), vec![EventType::Like]);

        assert!(engine.feed().item("q1").unwrap().is_liked);
        assert!(engine.profile().is_liked("q1"));
        assert_eq!(engine.profile().interaction_history.len(), 2);
    }

    #[test]
    fn test_engine_open_replaces_current_session() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap());
        let mut engine = engine(&clock);
        engine.start();

        engine.open("q1").unwrap();
        clock.advance_ms(5_000);
        let view = engine.open("q2").unwrap();

        assert_eq!(view.event_type(), EventType::View);
        assert_eq!(view.item_id, "q2");
        assert_eq!(engine.session().open_item(), Some("q2"));
        let history: Vec<InteractionEvent> =
            engine.profile().interaction_history.iter().cloned().collect();
        assert_eq!(
            event_types(&history),
            vec![EventType::View, EventType::TotalDwellTime, EventType::View]
        );
    }

    #[test]
    fn test_engine_regenerate_sees_profile() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap());
        let mut engine = engine(&clock);
        engine.start();
        engine.like("q1").unwrap();

        engine.regenerate();
        assert!(engine.feed().item("q1").unwrap().is_liked);
    }
}
