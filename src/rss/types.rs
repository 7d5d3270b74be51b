//! Feed types for newsrelay.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Maximum feed size in bytes (5MB).
pub const MAX_FEED_SIZE: u64 = 5 * 1024 * 1024;

/// Items kept for the board channel format.
pub const BOARD_MAX_ITEMS: usize = 10;

/// Items kept for the digest channel format.
pub const DIGEST_MAX_ITEMS: usize = 5;

/// Character budget of the plain-text fallback in the board format.
pub const BOARD_FALLBACK_CHARS: usize = 500;

/// Character budget of the plain-text fallback in the digest format.
pub const DIGEST_FALLBACK_CHARS: usize = 300;

/// One entry of a fetched feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// Entry ID (GUID).
    pub id: String,
    /// Entry title.
    pub title: String,
    /// Raw entry body, may contain markup.
    pub summary: String,
    /// Entry link.
    pub link: String,
    /// Publication time, when the feed provides one.
    pub published: Option<DateTime<Utc>>,
}

impl FeedEntry {
    /// Identity used for dedupe: the link, or the ID when there is no link.
    pub fn dedupe_key(&self) -> &str {
        if self.link.is_empty() {
            &self.id
        } else {
            &self.link
        }
    }
}

/// A fetched and parsed feed.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    /// Feed title.
    pub title: String,
    /// Entries in feed order.
    pub entries: Vec<FeedEntry>,
}

/// A numbered item extracted from an entry body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedItem {
    /// Leading number of the fragment (1..=99).
    pub ordinal: u8,
    /// Item text, trimmed.
    pub text: String,
    /// Source link, when the fragment carried one.
    pub link: Option<String>,
}

impl ExtractedItem {
    /// Render the item as Slack mrkdwn: `N. text <url|label>`.
    pub fn render(&self, details_label: &str) -> String {
        match &self.link {
            Some(link) => format!(
                "{}. {} <{}|{}>",
                self.ordinal, self.text, link, details_label
            ),
            None => format!("{}. {}", self.ordinal, self.text),
        }
    }
}

/// How the digest is rendered for a channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelFormat {
    /// Up to ten items separated by blank lines.
    #[default]
    Board,
    /// Bold title, up to five items and a link to the full entry.
    Digest,
}

impl ChannelFormat {
    /// Maximum number of items shown.
    pub fn max_items(self) -> usize {
        match self {
            ChannelFormat::Board => BOARD_MAX_ITEMS,
            ChannelFormat::Digest => DIGEST_MAX_ITEMS,
        }
    }

    /// Character budget of the plain-text fallback.
    pub fn fallback_chars(self) -> usize {
        match self {
            ChannelFormat::Board => BOARD_FALLBACK_CHARS,
            ChannelFormat::Digest => DIGEST_FALLBACK_CHARS,
        }
    }
}
