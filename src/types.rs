//! Core data types
//!
//! Content items as produced by the ranking boundary and the user profile the
//! store persists and hands back to it.

use crate::event::InteractionEvent;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// Medium of a content item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Article,
    Video,
    Podcast,
    Quote,
    Simulation,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Article => "article",
            ItemType::Video => "video",
            ItemType::Podcast => "podcast",
            ItemType::Quote => "quote",
            ItemType::Simulation => "simulation",
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A feed entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub image_url: String,
    #[serde(default)]
    pub is_liked: bool,
    /// Article body (HTML)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Video source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

/// Quick-lookup views derived from the interaction history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interactions {
    /// Items with at least one `like` event
    pub liked: BTreeSet<String>,
    /// Items with at least one `view` event
    pub viewed: BTreeSet<String>,
}

/// Aggregate root handed to the ranking boundary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub interactions: Interactions,
    /// Most recent events, oldest first
    pub interaction_history: VecDeque<InteractionEvent>,
}

impl UserProfile {
    /// Whether the user has produced any recorded interaction
    pub fn has_history(&self) -> bool {
        !self.interaction_history.is_empty()
    }

    /// Whether the item has been liked
    pub fn is_liked(&self, item_id: &str) -> bool {
        self.interactions.liked.contains(item_id)
    }

    /// Whether the item has been opened
    pub fn is_viewed(&self, item_id: &str) -> bool {
        self.interactions.viewed.contains(item_id)
    }
}
