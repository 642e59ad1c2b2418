//! Generator response decoding
//!
//! The generator answers with a JSON array of item suggestions. Each one is
//! turned into a displayable [`ContentItem`] with a batch-unique id, an image
//! url derived from its image query and a playable body for its medium.

use crate::error::GenerationError;
use crate::types::{ContentItem, ItemType};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Video shown for every generated video item
pub const PLACEHOLDER_VIDEO_URL: &str = "https://www.w3schools.com/html/mov_bbb.mp4";

/// One suggestion as returned by the generator
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedItem {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Short search phrase for a background image
    pub image_query: String,
}

impl GeneratedItem {
    fn into_content(self, batch_millis: i64, index: usize) -> ContentItem {
        let content = match self.item_type {
            ItemType::Article => Some(article_body(&self.title)),
            _ => None,
        };
        let video_url = match self.item_type {
            ItemType::Video => Some(PLACEHOLDER_VIDEO_URL.to_string()),
            _ => None,
        };

        ContentItem {
            id: format!("{batch_millis}-{index}"),
            item_type: self.item_type,
            image_url: format!(
                "https://picsum.photos/seed/{}/600/400",
                urlencoding::encode(&self.image_query)
            ),
            title: self.title,
            description: self.description,
            tags: self.tags,
            is_liked: false,
            content,
            video_url,
        }
    }
}

/// Decode a generator response produced at `generated_at`
pub fn decode_generated(
    response: &str,
    generated_at: DateTime<Utc>,
) -> Result<Vec<ContentItem>, GenerationError> {
    let generated: Vec<GeneratedItem> = serde_json::from_str(response.trim())
        .map_err(|e| GenerationError::Parse(e.to_string()))?;

    if generated.is_empty() {
        return Err(GenerationError::Empty);
    }

    let batch_millis = generated_at.timestamp_millis();
    Ok(generated
        .into_iter()
        .enumerate()
        .map(|(index, item)| item.into_content(batch_millis, index))
        .collect())
}

/// Article body: paragraphs, a figure and a code block, long enough to scroll
pub fn article_body(title: &str) -> String {
    let image_seed = urlencoding::encode(title);
    let section = format!(
        r#"<p>Introduction to {title}: a first pass over the idea, where it came from and why it keeps resurfacing in unexpected places.</p>
<img src="https://picsum.photos/seed/{image_seed}/600/300" alt="Related image for {title}" />
<p>Deeper dive: the mechanisms underneath, the open problems, and the people still arguing about them.</p>
<p>Exploring the nuances of {title}: the edge cases that make the simple version of the story fall apart.</p>
<pre><code>// Code example related to {title}
function concept() {{
    return "exploration";
}}</code></pre>
<p>Further considerations: what changes when the idea is applied at a different scale.</p>
<p>Conclusion on {title}: what to read, watch or try next.</p>
"#
    );
    section.repeat(3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    #[test]
    fn test_decode_maps_media_bodies() {
        let response = r#"
        [
            {"type": "video", "title": "Whale song", "description": "Listening to the deep", "tags": ["ocean"], "imageQuery": "humpback whale"},
            {"type": "article", "title": "Fermi's question", "description": "Where is everybody?", "tags": ["space", "probability"], "imageQuery": "night sky"},
            {"type": "quote", "title": "On attention", "description": "Attention is the rarest form of generosity.", "imageQuery": "candle"}
        ]
        "#;

        let items = decode_generated(response, at()).unwrap();
        assert_eq!(items.len(), 3);

        let millis = at().timestamp_millis();
        assert_eq!(items[0].id, format!("{millis}-0"));
        assert_eq!(items[2].id, format!("{millis}-2"));

        assert_eq!(items[0].video_url.as_deref(), Some(PLACEHOLDER_VIDEO_URL));
        assert!(items[0].content.is_none());

        let body = items[1].content.as_deref().unwrap();
        assert!(body.contains("<p>"));
        assert!(body.contains("<img"));
        assert!(body.contains("<pre>"));
        assert!(items[1].video_url.is_none());

        assert!(items[2].tags.is_empty());
        assert!(items.iter().all(|i| !i.is_liked));
    }

    #[test]
    fn test_image_query_is_url_encoded() {
        let response = r#"[{"type": "simulation", "title": "t", "description": "d", "tags": [], "imageQuery": "bioluminescent forest"}]"#;
        let items = decode_generated(response, at()).unwrap();
        assert_eq!(
            items[0].image_url,
            "https://picsum.photos/seed/bioluminescent%20forest/600/400"
        );
    }

    #[test]
    fn test_malformed_response() {
        let result = decode_generated("{\"items\": []}", at());
        assert!(matches!(result, Err(GenerationError::Parse(_))));

        let result = decode_generated(r#"[{"type": "meme", "title": "t", "description": "d", "imageQuery": "q"}]"#, at());
        assert!(matches!(result, Err(GenerationError::Parse(_))));
    }

    #[test]
    fn test_empty_response() {
        assert!(matches!(
            decode_generated("[]", at()),
            Err(GenerationError::Empty)
        ));
    }
}
