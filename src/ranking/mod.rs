//! Ranking boundary
//!
//! The content-generation service is external. This module defines the
//! contract the feed calls through, the deterministic fallback used when the
//! service fails, and a generator that drives any text-completion transport
//! with the engagement prompt and decodes its answer.

mod decode;
mod prompt;

pub use decode::{article_body, decode_generated, GeneratedItem, PLACEHOLDER_VIDEO_URL};
pub use prompt::{build_prompt, ITEMS_PER_FETCH};

use crate::error::GenerationError;
use crate::types::{ContentItem, ItemType, UserProfile};
use chrono::Utc;

/// Produces new content for a profile
pub trait ContentGenerator {
    fn generate(&self, profile: &UserProfile) -> Result<Vec<ContentItem>, GenerationError>;
}

impl<F> ContentGenerator for F
where
    F: Fn(&UserProfile) -> Result<Vec<ContentItem>, GenerationError>,
{
    fn generate(&self, profile: &UserProfile) -> Result<Vec<ContentItem>, GenerationError> {
        self(profile)
    }
}

/// Text-completion backend: prompt in, JSON text out
pub trait CompletionTransport {
    fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Generator that prompts a completion transport and decodes its response
pub struct PromptedGenerator<T> {
    transport: T,
}

impl<T: CompletionTransport> PromptedGenerator<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

impl<T: CompletionTransport> ContentGenerator for PromptedGenerator<T> {
    fn generate(&self, profile: &UserProfile) -> Result<Vec<ContentItem>, GenerationError> {
        let prompt = build_prompt(profile);
        let response = self.transport.complete(&prompt)?;
        decode_generated(&response, Utc::now())
    }
}

/// Content shown when generation fails. Never empty.
pub fn fallback_items() -> Vec<ContentItem> {
    let title = "The Beauty of the Cosmos";
    vec![ContentItem {
        id: "fallback-1".to_string(),
        item_type: ItemType::Article,
        title: title.to_string(),
        description: "An error occurred while fetching personalized content. \
                      Explore this article about space in the meantime."
            .to_string(),
        tags: vec!["space".to_string(), "science".to_string()],
        image_url: "https://picsum.photos/seed/cosmos/600/400".to_string(),
        is_liked: false,
        content: Some(article_body(title)),
        video_url: None,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct RecordingTransport {
        response: Result<String, GenerationError>,
        prompts: RefCell<Vec<String>>,
    }

    impl CompletionTransport for RecordingTransport {
        fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(GenerationError::Transport(e.to_string())),
            }
        }
    }

    #[test]
    fn test_fallback_is_deterministic_and_non_empty() {
        let first = fallback_items();
        assert!(!first.is_empty());
        assert_eq!(first, fallback_items());
        assert!(first[0].content.is_some());
    }

    #[test]
    fn test_prompted_generator_decodes_response() {
        let transport = RecordingTransport {
            response: Ok(r#"[{"type":"video","title":"Slow light","description":"d","tags":["optics"],"imageQuery":"prism light"}]"#.to_string()),
            prompts: RefCell::new(Vec::new()),
        };
        let generator = PromptedGenerator::new(transport);

        let items = generator.generate(&UserProfile::default()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_type, ItemType::Video);
        assert_eq!(generator.transport.prompts.borrow().len(), 1);
    }

    #[test]
    fn test_prompted_generator_propagates_transport_failure() {
        let transport = RecordingTransport {
            response: Err(GenerationError::Transport("timeout".to_string())),
            prompts: RefCell::new(Vec::new()),
        };
        let generator = PromptedGenerator::new(transport);

        let result = generator.generate(&UserProfile::default());
        assert!(matches!(result, Err(GenerationError::Transport(_))));
    }

    #[test]
    fn test_closure_generator() {
        let generator = |_: &UserProfile| -> Result<Vec<ContentItem>, GenerationError> {
            Ok(fallback_items())
        };
        assert_eq!(generator.generate(&UserProfile::default()).unwrap().len(), 1);
    }
}
