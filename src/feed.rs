//! Displayed feed
//!
//! Holds the items currently shown and the fetch state around them. The feed
//! never records events itself; a like toggle hands back the event to record.

use crate::event::{EventDetails, NewEvent};
use crate::ranking::{fallback_items, ContentGenerator};
use crate::types::{ContentItem, UserProfile};
use log::{info, warn};

/// Items on screen plus fetch state
#[derive(Debug, Clone)]
pub struct Feed {
    items: Vec<ContentItem>,
    loading: bool,
    initial_load: bool,
    degraded: bool,
}

impl Default for Feed {
    fn default() -> Self {
        Self::new()
    }
}

impl Feed {
    /// Empty feed awaiting its first fetch
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            loading: true,
            initial_load: true,
            degraded: false,
        }
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn item(&self, id: &str) -> Option<&ContentItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// No fetch has completed yet. Generation is synchronous, so this only
    /// holds between construction and the first `refresh`.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_initial_load(&self) -> bool {
        self.initial_load
    }

    /// Last refresh failed and the fallback items are shown
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Welcome screen applies until the first fetch, and only for a new user
    pub fn shows_welcome(&self, has_interacted: bool) -> bool {
        self.initial_load && !has_interacted
    }

    /// Leave the welcome state without fetching
    pub fn dismiss_welcome(&mut self) {
        self.initial_load = false;
    }

    /// Replace the displayed items with a fresh batch for `profile`.
    ///
    /// A failed generation shows the fallback items and marks the feed
    /// degraded. Loading and initial-load are cleared either way.
    pub fn refresh(&mut self, generator: &dyn ContentGenerator, profile: &UserProfile) {
        match generator.generate(profile) {
            Ok(items) => {
                info!("Feed refreshed with {} items", items.len());
                self.items = items
                    .into_iter()
                    .map(|mut item| {
                        item.is_liked = profile.is_liked(&item.id);
                        item
                    })
                    .collect();
                self.degraded = false;
            }
            Err(e) => {
                warn!("Content generation failed, showing fallback: {}", e);
                self.items = fallback_items();
                self.degraded = true;
            }
        }

        self.loading = false;
        self.initial_load = false;
    }

    /// Flip an item's like state.
    ///
    /// Returns the `like` event to record when the item goes from not liked
    /// to liked. Unliking and unknown ids return `None`.
    pub fn toggle_like(&mut self, item_id: &str) -> Option<NewEvent> {
        let item = self.items.iter_mut().find(|i| i.id == item_id)?;
        item.is_liked = !item.is_liked;
        if item.is_liked {
            Some(NewEvent::for_item(item, EventDetails::Like {}))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::event::EventType;
    use crate::types::ItemType;
    use pretty_assertions::assert_eq;

    fn item(id: &str) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            item_type: ItemType::Quote,
            title: format!("Quote {id}"),
            description: "d".to_string(),
            tags: vec![],
            image_url: format!("https://picsum.photos/seed/{id}/600/400"),
            is_liked: false,
            content: None,
            video_url: None,
        }
    }

    fn two_items(_: &UserProfile) -> Result<Vec<ContentItem>, GenerationError> {
        Ok(vec![item("q1"), item("q2")])
    }

    fn failing(_: &UserProfile) -> Result<Vec<ContentItem>, GenerationError> {
        Err(GenerationError::Transport("offline".to_string()))
    }

    #[test]
    fn test_new_feed_state() {
        let feed = Feed::new();
        assert!(feed.is_loading());
        assert!(feed.is_initial_load());
        assert!(feed.shows_welcome(false));
        assert!(!feed.shows_welcome(true));
    }

    #[test]
    fn test_refresh_replaces_items() {
        let mut feed = Feed::new();
        feed.refresh(&two_items, &UserProfile::default());

        assert_eq!(feed.items().len(), 2);
        assert!(!feed.is_loading());
        assert!(!feed.is_initial_load());
        assert!(!feed.is_degraded());

        // A later refresh never reports loading again
        feed.refresh(&failing, &UserProfile::default());
        assert!(!feed.is_loading());
    }

    #[test]
    fn test_refresh_failure_degrades_to_fallback() {
        let mut feed = Feed::new();
        feed.refresh(&failing, &UserProfile::default());

        assert!(feed.is_degraded());
        assert_eq!(feed.items(), fallback_items().as_slice());
        assert!(!feed.is_loading());

        feed.refresh(&two_items, &UserProfile::default());
        assert!(!feed.is_degraded());
    }

    #[test]
    fn test_refresh_marks_previously_liked() {
        let mut profile = UserProfile::default();
        profile.interactions.liked.insert("q2".to_string());

        let mut feed = Feed::new();
        feed.refresh(&two_items, &profile);

        assert!(!feed.item("q1").unwrap().is_liked);
        assert!(feed.item("q2").unwrap().is_liked);
    }

    #[test]
    fn test_toggle_like_records_only_on_like() {
        let mut feed = Feed::new();
        feed.refresh(&two_items, &UserProfile::default());

        let event = feed.toggle_like("q1").unwrap();
        assert_eq!(event.event_type(), EventType::Like);
        assert_eq!(event.item_id, "q1");
        assert!(feed.item("q1").unwrap().is_liked);

        assert!(feed.toggle_like("q1").is_none());
        assert!(!feed.item("q1").unwrap().is_liked);

        assert!(feed.toggle_like("missing").is_none());
    }
}
