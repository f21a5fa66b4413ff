//! Chat messages and the bubble that shows them.

use crate::constants::*;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::{Duration, Instant};

/// Lines the pet says when tapped
pub const CANNED_MESSAGES: &[&str] = &[
    "Hello! 👋",
    "I'm sleepy... 😴",
    "Pet me! 🐾",
    "Having a good day?",
    "Let's be friends! ❤️",
    "I love walking around!",
    "What's up? 🌟",
];

/// Where a chat message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatSource {
    Canned,
    Tip,
}

/// One speech-bubble message
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub text: String,
    /// Sentiment rating (0-10) of the article behind a tip
    pub rating: Option<u8>,
    pub source: ChatSource,
    /// Shortened title of the article a tip was drawn from
    pub article: Option<String>,
}

impl ChatMessage {
    pub fn canned(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rating: None,
            source: ChatSource::Canned,
            article: None,
        }
    }

    pub fn tip(text: impl Into<String>, rating: Option<u8>, article: Option<String>) -> Self {
        Self {
            text: text.into(),
            rating,
            source: ChatSource::Tip,
            article,
        }
    }

    /// Pick a random canned line
    pub fn random_canned(rng: &mut impl Rng) -> Self {
        let text = CANNED_MESSAGES.choose(rng).copied().unwrap_or("Hello!");
        Self::canned(text)
    }

    pub fn is_news(&self) -> bool {
        self.source == ChatSource::Tip
    }

    /// How long the bubble for this message stays up
    pub fn display_duration(&self) -> Duration {
        let secs = match self.source {
            ChatSource::Canned => CHAT_CANNED_SECS,
            ChatSource::Tip => CHAT_TIP_SECS,
        };
        Duration::from_secs_f32(secs)
    }
}

/// A visible bubble. Lives as long as the chat state that showed it,
/// unless the pet is picked up first.
#[derive(Debug, Clone)]
pub struct ChatBubble {
    pub message: ChatMessage,
    pub shown_at: Instant,
    pub timeout: Duration,
}

impl ChatBubble {
    pub fn new(message: ChatMessage, now: Instant) -> Self {
        let timeout = message.display_duration();
        Self {
            message,
            shown_at: now,
            timeout,
        }
    }
}

/// Shorten `text` to at most `max_chars` characters, ending in "..." when cut
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_canned_comes_from_list() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let msg = ChatMessage::random_canned(&mut rng);
            assert!(CANNED_MESSAGES.contains(&msg.text.as_str()));
            assert_eq!(msg.source, ChatSource::Canned);
            assert!(!msg.is_news());
        }
    }

    #[test]
    fn test_display_durations() {
        assert_eq!(ChatMessage::canned("hi").display_duration(), Duration::from_secs(6));
        assert_eq!(
            ChatMessage::tip("bike to work", Some(7), None).display_duration(),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_bubble_timeout_follows_message() {
        let t0 = Instant::now();
        let bubble = ChatBubble::new(ChatMessage::tip("fix the tap", None, None), t0);
        assert_eq!(bubble.shown_at, t0);
        assert_eq!(bubble.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_with_ellipsis("Turn off the lights", 80), "Turn off the lights");
    }

    #[test]
    fn test_truncate_long_text() {
        let long = "x".repeat(100);
        let cut = truncate_with_ellipsis(&long, TIP_MAX_CHARS);
        assert_eq!(cut.chars().count(), TIP_MAX_CHARS);
        assert!(cut.ends_with("..."));
        assert_eq!(&cut[..77], &long[..77]);
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let text = "🌱".repeat(10);
        let cut = truncate_with_ellipsis(&text, 5);
        assert_eq!(cut, "🌱🌱...");
    }
}
