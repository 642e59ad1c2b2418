//! Article collector
//!
//! Tracks scroll depth, bounce, scroll speed, text selection and per-element
//! dwell for one article session.

use super::rounded_percent;
use crate::config::EngineConfig;
use crate::event::EventDetails;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Thresholds the article collector applies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArticleThresholds {
    pub scroll_depth_min_percent: u32,
    pub bounce_depth_percent: u32,
    pub bounce_top_px: f64,
    pub selection_min_chars: usize,
    pub visibility_ratio: f64,
    pub element_dwell_ms: i64,
}

impl Default for ArticleThresholds {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for ArticleThresholds {
    fn from(config: &EngineConfig) -> Self {
        Self {
            scroll_depth_min_percent: config.scroll_depth_min_percent,
            bounce_depth_percent: config.bounce_depth_percent,
            bounce_top_px: config.bounce_top_px,
            selection_min_chars: config.selection_min_chars,
            visibility_ratio: config.visibility_ratio,
            element_dwell_ms: config.element_dwell_ms,
        }
    }
}

/// Scroll geometry of the content viewport at one notification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl Viewport {
    /// Scrollable distance; not positive when the content fits the viewport
    pub fn scrollable(&self) -> f64 {
        self.scroll_height - self.client_height
    }
}

/// One recorded scroll position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSample {
    pub offset: f64,
    pub at: DateTime<Utc>,
}

/// Paragraph, image or code block under visibility observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedElement {
    /// Position among the observed elements of the article body
    pub index: usize,
    /// Tag name (`p`, `img`, `pre`)
    pub tag: String,
    /// Identifier the element already carries, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ObservedElement {
    pub fn new(index: usize, tag: impl Into<String>) -> Self {
        Self {
            index,
            tag: tag.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Identifier used for dwell tracking: the element's own id, or a stable
    /// per-item-per-index id
    pub fn resolved_id(&self, item_id: &str) -> String {
        match &self.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("observed-{}-{}", item_id, self.index),
        }
    }
}

/// Running state for one article session
#[derive(Debug, Clone)]
pub struct ArticleCollector {
    item_id: String,
    thresholds: ArticleThresholds,
    samples: Vec<ScrollSample>,
    max_scroll_percent: u32,
    bounced: bool,
    /// Element id -> instant it became visible
    entry_times: HashMap<String, DateTime<Utc>>,
}

impl ArticleCollector {
    pub fn new(item_id: impl Into<String>, thresholds: ArticleThresholds) -> Self {
        Self {
            item_id: item_id.into(),
            thresholds,
            samples: Vec::new(),
            max_scroll_percent: 0,
            bounced: false,
            entry_times: HashMap::new(),
        }
    }

    pub fn max_scroll_percent(&self) -> u32 {
        self.max_scroll_percent
    }

    pub fn bounced(&self) -> bool {
        self.bounced
    }

    pub fn samples(&self) -> &[ScrollSample] {
        &self.samples
    }

    /// Record a scroll notification. Non-scrollable viewports are ignored.
    pub fn on_scroll(&mut self, viewport: Viewport, at: DateTime<Utc>) {
        let Some(percent) = rounded_percent(viewport.scroll_top, viewport.scrollable()) else {
            return;
        };

        // Armed only by depth reached on an earlier sample
        if self.max_scroll_percent > self.thresholds.bounce_depth_percent
            && viewport.scroll_top < self.thresholds.bounce_top_px
        {
            self.bounced = true;
        }

        self.max_scroll_percent = self.max_scroll_percent.max(percent);
        self.samples.push(ScrollSample {
            offset: viewport.scroll_top,
            at,
        });
    }

    /// Pointer released inside the viewport with `selection` as the active
    /// text selection
    pub fn on_pointer_up(&mut self, selection: &str) -> Option<EventDetails> {
        let selected = selection.trim();
        // Length in UTF-16 code units, as the host UI measures it
        if selected.encode_utf16().count() > self.thresholds.selection_min_chars {
            Some(EventDetails::TextSelection {
                selected_text: selected.to_string(),
            })
        } else {
            None
        }
    }

    /// Visibility of an observed element changed to `ratio` of its area
    pub fn on_visibility(
        &mut self,
        element: &ObservedElement,
        ratio: f64,
        at: DateTime<Utc>,
    ) -> Option<EventDetails> {
        let element_id = element.resolved_id(&self.item_id);

        if ratio >= self.thresholds.visibility_ratio {
            // Still visible: keep the first entry time
            self.entry_times.entry(element_id).or_insert(at);
            return None;
        }

        let entered = self.entry_times.remove(&element_id)?;
        let dwell_ms = (at - entered).num_milliseconds();
        if dwell_ms > self.thresholds.element_dwell_ms {
            Some(EventDetails::DwellOnElement {
                duration_ms: dwell_ms as u64,
                element_tag: element.tag.to_lowercase(),
                element_id: Some(element_id),
            })
        } else {
            None
        }
    }

    /// Average scroll speed in px/s over the whole session
    pub fn average_speed(&self) -> Option<u64> {
        if self.samples.len() < 2 {
            return None;
        }

        let distance: f64 = self
            .samples
            .windows(2)
            .map(|pair| (pair[1].offset - pair[0].offset).abs())
            .sum();

        let first = self.samples.first()?;
        let last = self.samples.last()?;
        let elapsed_ms = (last.at - first.at).num_milliseconds();
        if elapsed_ms <= 0 {
            return None;
        }

        Some((distance / (elapsed_ms as f64 / 1000.0)).round() as u64)
    }

    /// Session-summary events; consumes the collector
    pub fn finish(self) -> Vec<EventDetails> {
        let mut events = Vec::new();

        if self.max_scroll_percent > self.thresholds.scroll_depth_min_percent {
            events.push(EventDetails::ScrollDepth {
                scroll_percent: self.max_scroll_percent,
            });
        }

        if self.bounced {
            events.push(EventDetails::ScrollBounce {});
        }

        if let Some(speed_pxs) = self.average_speed() {
            events.push(EventDetails::AvgScrollSpeed { speed_pxs });
        }

        events
    }
}
