//! Feed module for newsrelay.
//!
//! Fetching, keyword filtering, numbered-item extraction and rendering of
//! feed entries into message bodies.

pub mod extractor;
pub mod fetcher;
pub mod filter;
pub mod format;
pub mod types;

pub use extractor::{
    extract, normalize_line_breaks, plain_text_fallback, strip_dates, strip_tags,
};
pub use fetcher::{parse_feed, FeedSource, HttpFeedFetcher};
pub use filter::include;
pub use format::EntryFormatter;
pub use types::{
    ChannelFormat, ExtractedItem, FeedEntry, ParsedFeed, BOARD_MAX_ITEMS, DIGEST_MAX_ITEMS,
    MAX_FEED_SIZE,
};
