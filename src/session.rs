//! Session controller
//!
//! Drives the open/close lifecycle of an item's detail view. Opening an item
//! records a `view` and attaches the collector for its medium; raw signals are
//! routed to that collector and any immediate events are recorded as they
//! occur; closing records the dwell summary plus the collector's summary events
//! and discards the collector.
//!
//! Only one item is open at a time. Opening another item closes the current
//! session first.

use crate::collector::{
    self, ArticleCollector, ArticleThresholds, ObservedElement, VideoCollector, VideoThresholds,
    Viewport,
};
use crate::config::EngineConfig;
use crate::event::{EventDetails, InteractionEvent, MediaSource, NewEvent};
use crate::profile::ProfileStore;
use crate::types::{ContentItem, ItemType};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the detail view was dismissed. All reasons finalize identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    CloseButton,
    OverlayClick,
    Escape,
    /// Another item was opened over this one
    Replaced,
}

/// Collector attached to the open session
#[derive(Debug, Clone)]
enum MediumCollector {
    Article(ArticleCollector),
    Video(VideoCollector),
    /// Podcasts, quotes and simulations only report dwell
    Passive,
}

#[derive(Debug, Clone)]
struct OpenSession {
    session_id: Uuid,
    item_id: String,
    item_type: ItemType,
    opened_at: DateTime<Utc>,
    collector: MediumCollector,
}

/// Outcome of closing a session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub item_id: String,
    pub item_type: ItemType,
    pub reason: CloseReason,
    pub duration_ms: u64,
    /// Summary events recorded on close, in recording order
    pub events: Vec<InteractionEvent>,
}

/// Session state machine over a profile store
pub struct SessionController {
    store: ProfileStore,
    config: EngineConfig,
    open: Option<OpenSession>,
}

impl SessionController {
    pub fn new(store: ProfileStore, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            open: None,
        }
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ProfileStore {
        &mut self.store
    }

    pub fn into_store(self) -> ProfileStore {
        self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Id of the item whose detail view is open
    pub fn open_item(&self) -> Option<&str> {
        self.open.as_ref().map(|s| s.item_id.as_str())
    }

    /// Open a feed item's detail view
    pub fn open_content(&mut self, item: &ContentItem) -> InteractionEvent {
        self.open(item.id.clone(), item.item_type)
    }

    /// Open an item's detail view and record the `view`
    pub fn open(&mut self, item_id: impl Into<String>, item_type: ItemType) -> InteractionEvent {
        if self.open.is_some() {
            self.close(CloseReason::Replaced);
        }

        let item_id = item_id.into();
        let collector = match item_type {
            ItemType::Article => MediumCollector::Article(ArticleCollector::new(
                item_id.clone(),
                ArticleThresholds::from(&self.config),
            )),
            ItemType::Video => {
                MediumCollector::Video(VideoCollector::new(VideoThresholds::from(&self.config)))
            }
            _ => MediumCollector::Passive,
        };

        let session = OpenSession {
            session_id: Uuid::new_v4(),
            item_id,
            item_type,
            opened_at: self.store.now(),
            collector,
        };
        debug!(
            "Session {} opened for {} {}",
            session.session_id, session.item_type, session.item_id
        );

        let view = NewEvent::new(session.item_id.clone(), item_type, EventDetails::View {});
        self.open = Some(session);
        self.store.record(view)
    }

    /// Close the open detail view, recording its summary events.
    ///
    /// Returns `None` when nothing was open.
    pub fn close(&mut self, reason: CloseReason) -> Option<SessionSummary> {
        let session = self.open.take()?;
        let duration_ms = (self.store.now() - session.opened_at)
            .num_milliseconds()
            .max(0);

        let mut details = vec![EventDetails::TotalDwellTime {
            duration_ms: duration_ms as u64,
        }];
        if duration_ms < self.config.quick_exit_ms {
            details.push(EventDetails::QuickExit {
                duration_ms: duration_ms as u64,
            });
        }

        match session.collector {
            MediumCollector::Article(article) => details.extend(article.finish()),
            MediumCollector::Video(video) => details.extend(video.finish()),
            MediumCollector::Passive => {}
        }

        let events: Vec<InteractionEvent> = details
            .into_iter()
            .map(|d| {
                self.store
                    .record(NewEvent::new(session.item_id.clone(), session.item_type, d))
            })
            .collect();

        debug!(
            "Session {} closed ({:?}) after {} ms with {} summary events",
            session.session_id,
            reason,
            duration_ms,
            events.len()
        );

        Some(SessionSummary {
            session_id: session.session_id,
            item_id: session.item_id,
            item_type: session.item_type,
            reason,
            duration_ms: duration_ms as u64,
            events,
        })
    }

    /// Record an explicit like (cards can be liked without opening them)
    pub fn like(&mut self, item_id: impl Into<String>, item_type: ItemType) -> InteractionEvent {
        self.store
            .record(NewEvent::new(item_id, item_type, EventDetails::Like {}))
    }

    pub fn on_scroll(&mut self, viewport: Viewport) {
        let now = self.store.now();
        match self.open.as_mut().map(|s| &mut s.collector) {
            Some(MediumCollector::Article(article)) => article.on_scroll(viewport, now),
            _ => debug!("Ignoring scroll outside an article session"),
        }
    }

    pub fn on_pointer_up(&mut self, selection: &str) -> Option<InteractionEvent> {
        let details = match self.open.as_mut().map(|s| &mut s.collector) {
            Some(MediumCollector::Article(article)) => article.on_pointer_up(selection),
            _ => {
                debug!("Ignoring selection outside an article session");
                None
            }
        }?;
        self.record_for_open(details)
    }

    pub fn on_visibility(
        &mut self,
        element: &ObservedElement,
        ratio: f64,
    ) -> Option<InteractionEvent> {
        let now = self.store.now();
        let details = match self.open.as_mut().map(|s| &mut s.collector) {
            Some(MediumCollector::Article(article)) => article.on_visibility(element, ratio, now),
            _ => {
                debug!("Ignoring visibility change outside an article session");
                None
            }
        }?;
        self.record_for_open(details)
    }

    pub fn on_time_update(&mut self, current_time: f64, duration: f64) {
        match self.open.as_mut().map(|s| &mut s.collector) {
            Some(MediumCollector::Video(video)) => video.on_time_update(current_time, duration),
            _ => debug!("Ignoring time update outside a video session"),
        }
    }

    pub fn on_seeking(&mut self, target_time: f64) -> Option<InteractionEvent> {
        let details = match self.open.as_ref().map(|s| &s.collector) {
            Some(MediumCollector::Video(video)) => video.on_seeking(target_time),
            _ => {
                debug!("Ignoring seek outside a video session");
                None
            }
        }?;
        self.record_for_open(details)
    }

    pub fn on_rate_change(&mut self, playback_rate: f64) -> Option<InteractionEvent> {
        let details = match self.open.as_ref().map(|s| &s.collector) {
            Some(MediumCollector::Video(video)) => Some(video.on_rate_change(playback_rate)),
            _ => {
                debug!("Ignoring rate change outside a video session");
                None
            }
        }?;
        self.record_for_open(details)
    }

    pub fn on_volume_change(&mut self, volume: f64, muted: bool) -> Option<InteractionEvent> {
        let details = match self.open.as_ref().map(|s| &s.collector) {
            Some(MediumCollector::Video(video)) => Some(video.on_volume_change(volume, muted)),
            _ => {
                debug!("Ignoring volume change outside a video session");
                None
            }
        }?;
        self.record_for_open(details)
    }

    /// Image or video in the open detail view failed to load
    pub fn on_load_error(&mut self, source: MediaSource) -> Option<InteractionEvent> {
        if self.open.is_none() {
            debug!("Ignoring load error with no open session");
        }
        self.record_for_open(collector::load_error(source))
    }

    fn record_for_open(&mut self, details: EventDetails) -> Option<InteractionEvent> {
        let session = self.open.as_ref()?;
        let event = NewEvent::new(session.item_id.clone(), session.item_type, details);
        Some(self.store.record(event))
    }
}
