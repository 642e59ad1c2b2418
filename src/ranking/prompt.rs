//! Engagement prompt
//!
//! Renders a profile into the instruction text sent to a completion backend.

use crate::types::UserProfile;
use log::warn;

/// Number of suggestions requested per fetch
pub const ITEMS_PER_FETCH: usize = 8;

const FIRST_SESSION: &str = "This is the user's first session. Offer a diverse, broadly appealing \
set of inspiring content so their preferences can start to be learned.";

const SIGNAL_GUIDE: &str = r#"Read these events as evidence of latent interests. How to weigh them:

Core engagement (highest weight):
- "like": explicit, very strong positive.
- "total_dwell_time": a high durationMs (over 60000) means sustained interest; low is neutral.
- "quick_exit": durationMs under 3000 is a very strong negative. The item was rejected on sight.

Video:
- "video_watch_progress": watchPercent over 85 is high engagement, under 20 is disinterest, between is moderate.
- "video_rewind": extremely strong interest in the re-watched span (seekFromS to seekToS).
- "video_seek_forward": strong negative for the skipped span.
- "video_rate_change": playbackRate above 1 suggests hurrying through, a weaker signal.

Article:
- "dwell_on_element": durationMs over 2000 on an img, p or pre element shows curiosity about that part.
- "text_selection": selectedText names the exact concept the user focused on. Top-tier signal.
- "avg_scroll_speed": speedPxs under 500 means careful reading; high speed means skimming.
- "scroll_depth": scrollPercent over 90 is good, but only with low scroll speed.
- "scroll_bounce": negative, the user skimmed to the end without finding anything.

Use these to understand both what the user likes and how they engage with each medium."#;

/// Build the generation prompt for a profile.
///
/// An empty history yields the first-session variant; otherwise every history
/// event is embedded as one JSON object per line, oldest first.
pub fn build_prompt(profile: &UserProfile) -> String {
    let user_section = if profile.has_history() {
        let mut section = String::from(
            "The user's recent interaction history, one JSON event per line:\n",
        );
        for event in &profile.interaction_history {
            match serde_json::to_string(event) {
                Ok(line) => {
                    section.push_str(&line);
                    section.push('\n');
                }
                Err(e) => warn!("skipping unserializable history event: {e}"),
            }
        }
        section.push('\n');
        section.push_str(SIGNAL_GUIDE);
        section
    } else {
        FIRST_SESSION.to_string()
    };

    format!(
        r#"You are the "Empathetic Engine" of Nexus Personale, a feed that anticipates what will inspire its user next.
Favor personal growth, curiosity and discovery over passive entertainment.

Based on the profile below, generate {ITEMS_PER_FETCH} new, unique and deeply engaging content suggestions.
Connect concepts in unexpected ways.

User profile:
{user_section}

The first item should be a serendipity piece that feels perfectly timed for this user.
Avoid repeating recent topics unless taking a much deeper or different angle.

Content distribution (strict, the user strongly prefers visual content):
- "video": about 90% (around 7 items)
- "quote" or "simulation": about 9% (around 1 item)
- "article" or "podcast": about 1% (none, or one at most if highly relevant)

Respond with a JSON array only. Each element has "type" (article, video, podcast, quote or simulation),
"title", "description", "tags" (2-3 keywords) and "imageQuery" (2-3 words describing a striking background image).
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventDetails, NewEvent};
    use crate::types::ItemType;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_first_session_prompt() {
        let prompt = build_prompt(&UserProfile::default());
        assert!(prompt.contains("first session"));
        assert!(!prompt.contains("one JSON event per line"));
        assert!(prompt.contains("generate 8 new"));
        assert!(prompt.contains("about 90%"));
    }

    #[test]
    fn test_history_prompt_embeds_events_in_order() {
        let mut profile = UserProfile::default();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        profile.interaction_history.push_back(
            NewEvent::new("a1", ItemType::Article, EventDetails::View {}).at(t0),
        );
        profile.interaction_history.push_back(
            NewEvent::new(
                "a1",
                ItemType::Article,
                EventDetails::TextSelection {
                    selected_text: "entropy".to_string(),
                },
            )
            .at(t0),
        );

        let prompt = build_prompt(&profile);
        assert!(!prompt.contains("first session"));
        assert!(prompt.contains("\"selectedText\":\"entropy\""));

        let view_at = prompt.find("\"eventType\":\"view\"").unwrap();
        let selection_at = prompt.find("\"eventType\":\"text_selection\"").unwrap();
        assert!(view_at < selection_at);
        assert!(prompt.contains("scroll_bounce"));
    }
}
