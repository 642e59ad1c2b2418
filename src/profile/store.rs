//! Profile store
//!
//! Owns the user profile: a bounded interaction history plus the `liked` and
//! `viewed` lookup sets derived from it. Every recorded event is persisted
//! immediately. Persistence is best effort; the in-memory profile stays
//! authoritative for the running session.

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::StorageError;
use crate::event::{EventDetails, InteractionEvent, NewEvent};
use crate::profile::storage::ProfileStorage;
use crate::types::{Interactions, UserProfile};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::VecDeque;

/// Single writer of the user profile
pub struct ProfileStore {
    profile: UserProfile,
    storage: Box<dyn ProfileStorage>,
    clock: Box<dyn Clock>,
    key: String,
    history_limit: usize,
}

impl ProfileStore {
    /// Store starting from an empty profile, ignoring anything persisted
    pub fn new(
        storage: Box<dyn ProfileStorage>,
        clock: Box<dyn Clock>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            profile: UserProfile::default(),
            storage,
            clock,
            key: config.profile_key.clone(),
            history_limit: config.history_limit.max(1),
        }
    }

    /// Store restored from persisted state.
    ///
    /// A record that cannot be read or parsed yields the default profile; a
    /// corrupt record is removed so it is not read again.
    pub fn load(
        storage: Box<dyn ProfileStorage>,
        clock: Box<dyn Clock>,
        config: &EngineConfig,
    ) -> Self {
        let mut store = Self::new(storage, clock, config);

        let raw = match store.storage.read(&store.key) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to read user profile, starting fresh: {}", e);
                None
            }
        };

        if let Some(raw) = raw {
            match serde_json::from_str::<UserProfile>(&raw) {
                Ok(profile) => {
                    store.profile = profile;
                    store.trim_history();
                    debug!(
                        "Loaded user profile with {} events",
                        store.profile.interaction_history.len()
                    );
                }
                Err(e) => {
                    warn!("Failed to load user profile, discarding it: {}", e);
                    if let Err(e) = store.storage.remove(&store.key) {
                        warn!("Failed to remove corrupt user profile: {}", e);
                    }
                }
            }
        }

        store
    }

    /// Current instant as seen by the store
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Stamp, append and persist an event
    pub fn record(&mut self, event: NewEvent) -> InteractionEvent {
        let mut timestamp = self.clock.now();
        if let Some(last) = self.profile.interaction_history.back() {
            // Keep history ordered even if the clock steps backwards
            timestamp = timestamp.max(last.timestamp);
        }

        match &event.details {
            EventDetails::Like {} => {
                self.profile.interactions.liked.insert(event.item_id.clone());
            }
            EventDetails::View {} => {
                self.profile.interactions.viewed.insert(event.item_id.clone());
            }
            _ => {}
        }

        let recorded = event.at(timestamp);
        self.profile.interaction_history.push_back(recorded.clone());
        self.trim_history();

        if let Err(e) = self.persist() {
            warn!("Failed to save user profile: {}", e);
        }

        recorded
    }

    /// Write the current profile to storage
    pub fn persist(&mut self) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.profile).map_err(StorageError::Serialize)?;
        self.storage.write(&self.key, &json)
    }

    /// Borrow the live profile
    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Immutable copy for the ranking boundary
    pub fn snapshot(&self) -> UserProfile {
        self.profile.clone()
    }

    /// Whether any interaction has been recorded (or restored)
    pub fn has_interacted(&self) -> bool {
        self.profile.has_history()
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub fn storage(&self) -> &dyn ProfileStorage {
        self.storage.as_ref()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Forget all interactions and delete the persisted record
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.profile = UserProfile::default();
        self.storage.remove(&self.key)
    }

    fn trim_history(&mut self) {
        while self.profile.interaction_history.len() > self.history_limit {
            self.profile.interaction_history.pop_front();
        }
    }
}

/// Recompute the lookup sets from a history
pub fn rebuild_interactions(history: &VecDeque<InteractionEvent>) -> Interactions {
    let mut interactions = Interactions::default();
    for event in history {
        match event.details {
            EventDetails::Like {} => {
                interactions.liked.insert(event.item_id.clone());
            }
            EventDetails::View {} => {
                interactions.viewed.insert(event.item_id.clone());
            }
            _ => {}
        }
    }
    interactions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event::EventType;
    use crate::profile::storage::MemoryStorage;
    use crate::types::ItemType;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    const KEY: &str = crate::config::DEFAULT_PROFILE_KEY;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    fn store_with(storage: MemoryStorage) -> (ProfileStore, ManualClock) {
        let clock = ManualClock::new(start());
        let store = ProfileStore::load(
            Box::new(storage),
            Box::new(clock.clone()),
            &EngineConfig::default(),
        );
        (store, clock)
    }

    fn dwell(item: &str, ms: u64) -> NewEvent {
        NewEvent::new(
            item,
            ItemType::Article,
            EventDetails::TotalDwellTime { duration_ms: ms },
        )
    }

    fn like(item: &str) -> NewEvent {
        NewEvent::new(item, ItemType::Video, EventDetails::Like {})
    }

    fn view(item: &str) -> NewEvent {
        NewEvent::new(item, ItemType::Video, EventDetails::View {})
    }

    #[test]
    fn test_record_stamps_current_time() {
        let (mut store, clock) = store_with(MemoryStorage::new());
        clock.advance_ms(1_500);

        let event = store.record(view("v-1"));
        assert_eq!(event.timestamp, start() + chrono::Duration::milliseconds(1_500));
        assert_eq!(event.event_type(), EventType::View);
        assert!(store.has_interacted());
    }

    #[test]
    fn test_history_capped_at_most_recent_events() {
        let (mut store, clock) = store_with(MemoryStorage::new());

        for i in 0..130u64 {
            clock.advance_ms(10);
            store.record(dwell(&format!("item-{i}"), i));
            assert!(store.profile().interaction_history.len() <= 100);
        }

        let history = &store.profile().interaction_history;
        assert_eq!(history.len(), 100);
        let ids: Vec<&str> = history.iter().map(|e| e.item_id.as_str()).collect();
        let expected: Vec<String> = (30..130).map(|i| format!("item-{i}")).collect();
        assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_liked_and_viewed_sets_deduplicated() {
        let (mut store, _clock) = store_with(MemoryStorage::new());

        store.record(like("a"));
        store.record(like("a"));
        store.record(like("b"));
        store.record(view("c"));
        store.record(dwell("d", 4_000));

        let interactions = &store.profile().interactions;
        assert_eq!(
            interactions.liked,
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );
        assert_eq!(interactions.viewed, BTreeSet::from(["c".to_string()]));
    }

    #[test]
    fn test_liked_matches_history_within_window() {
        let (mut store, _clock) = store_with(MemoryStorage::new());

        for i in 0..40 {
            store.record(like(&format!("liked-{}", i % 7)));
            store.record(view(&format!("viewed-{}", i % 5)));
        }

        let rebuilt = rebuild_interactions(&store.profile().interaction_history);
        assert_eq!(rebuilt.liked, store.profile().interactions.liked);
        assert_eq!(rebuilt.viewed, store.profile().interactions.viewed);
    }

    #[test]
    fn test_every_record_is_persisted() {
        let (mut store, _clock) = store_with(MemoryStorage::new());
        store.record(view("v-1"));
        store.record(like("v-1"));

        let raw = store.storage().read(KEY).unwrap().unwrap();
        let persisted: UserProfile = serde_json::from_str(&raw).unwrap();
        assert_eq!(&persisted, store.profile());
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let (mut store, _clock) = store_with(MemoryStorage::read_only());

        store.record(like("v-9"));

        assert_eq!(store.profile().interaction_history.len(), 1);
        assert!(store.profile().is_liked("v-9"));
        assert!(store.persist().is_err());
    }

    #[test]
    fn test_load_restores_persisted_profile() {
        let (mut first, _clock) = store_with(MemoryStorage::new());
        first.record(view("a-1"));
        first.record(dwell("a-1", 12_000));
        let raw = first.storage().read(KEY).unwrap().unwrap();

        let (second, _clock) = store_with(MemoryStorage::with_record(KEY, raw));
        assert_eq!(second.profile(), first.profile());
        assert!(second.has_interacted());
    }

    #[test]
    fn test_malformed_profile_fails_open() {
        let storage = MemoryStorage::with_record(KEY, r#"{"interactions": 42}"#);
        let (store, _clock) = store_with(storage);

        assert_eq!(store.profile(), &UserProfile::default());
        assert!(!store.has_interacted());
        // Corrupt record was discarded
        assert_eq!(store.storage().read(KEY).unwrap(), None);
    }

    #[test]
    fn test_invalid_json_fails_open() {
        let storage = MemoryStorage::with_record(KEY, "not json at all");
        let (store, _clock) = store_with(storage);
        assert_eq!(store.profile(), &UserProfile::default());
    }

    #[test]
    fn test_loads_profile_written_by_browser_client() {
        let raw = r#"{
            "interactions": { "liked": ["1705327200000-2"], "viewed": ["1705327200000-2", "1705327200000-5"] },
            "interactionHistory": [
                { "itemId": "1705327200000-2", "itemType": "video", "eventType": "view", "details": {}, "timestamp": "2024-01-15T13:00:00.000Z" },
                { "itemId": "1705327200000-2", "itemType": "video", "eventType": "video_watch_progress", "details": { "watchPercent": 88 }, "timestamp": "2024-01-15T13:01:10.412Z" },
                { "itemId": "1705327200000-2", "itemType": "video", "eventType": "like", "details": {}, "timestamp": "2024-01-15T13:01:12.000Z" }
            ]
        }"#;
        let (store, _clock) = store_with(MemoryStorage::with_record(KEY, raw));

        assert_eq!(store.profile().interaction_history.len(), 3);
        assert!(store.profile().is_liked("1705327200000-2"));
        // Legacy data may list views outside the retained history
        assert!(store.profile().is_viewed("1705327200000-5"));
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let (mut store, clock) = store_with(MemoryStorage::new());
        clock.advance_ms(5_000);
        store.record(view("a"));
        clock.advance_ms(-2_000);
        let stamped = store.record(dwell("a", 10)).timestamp;

        assert_eq!(stamped, start() + chrono::Duration::milliseconds(5_000));
    }

    #[test]
    fn test_load_trims_oversized_history() {
        let (mut big, _clock) = store_with(MemoryStorage::new());
        for i in 0..50 {
            big.record(dwell(&format!("i-{i}"), 1));
        }
        let raw = big.storage().read(KEY).unwrap().unwrap();

        let config = EngineConfig {
            history_limit: 10,
            ..EngineConfig::default()
        };
        let store = ProfileStore::load(
            Box::new(MemoryStorage::with_record(KEY, raw)),
            Box::new(ManualClock::new(start())),
            &config,
        );

        let history = &store.profile().interaction_history;
        assert_eq!(history.len(), 10);
        assert_eq!(history.front().unwrap().item_id, "i-40");
    }

    #[test]
    fn test_clear_removes_record() {
        let (mut store, _clock) = store_with(MemoryStorage::new());
        store.record(like("x"));
        store.clear().unwrap();

        assert!(!store.has_interacted());
        assert_eq!(store.storage().read(KEY).unwrap(), None);
    }
}
