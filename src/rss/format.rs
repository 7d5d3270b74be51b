//! Message bodies for the supported channel formats.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

use crate::config::{FeedConfig, MessageConfig};
use crate::datetime::heading_date;
use crate::rss::extractor::{extract, plain_text_fallback};
use crate::rss::types::{ChannelFormat, FeedEntry};

static TITLE_DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}/\d{1,2}/\d{1,2}").unwrap());

/// Renders feed entries into Slack mrkdwn bodies.
#[derive(Debug, Clone)]
pub struct EntryFormatter {
    title_prefix: String,
    details_label: String,
    full_content_label: String,
    source_name: String,
}

impl EntryFormatter {
    /// Create a formatter.
    pub fn new(
        title_prefix: impl Into<String>,
        details_label: impl Into<String>,
        full_content_label: impl Into<String>,
    ) -> Self {
        Self {
            title_prefix: title_prefix.into(),
            details_label: details_label.into(),
            full_content_label: full_content_label.into(),
            source_name: String::new(),
        }
    }

    /// Only normalize digest titles that contain `name`.
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    /// Create a formatter from configuration.
    pub fn from_config(feed: &FeedConfig, message: &MessageConfig) -> Self {
        Self::new(
            &feed.title_prefix,
            &message.details_label,
            &message.full_content_label,
        )
        .with_source_name(&feed.source_name)
    }

    /// The heading of the daily list for `date`, e.g. `prefix2025/6/25`.
    pub fn daily_heading(&self, date: NaiveDate) -> String {
        format!("{}{}", self.title_prefix, heading_date(date))
    }

    /// Render the body of `entry` for a channel format.
    pub fn render(&self, entry: &FeedEntry, format: ChannelFormat) -> String {
        match format {
            ChannelFormat::Board => self.render_board(entry),
            ChannelFormat::Digest => self.render_digest(entry),
        }
    }

    fn items_or_fallback(&self, entry: &FeedEntry, format: ChannelFormat) -> Option<Vec<String>> {
        let items = extract(&entry.summary);
        if items.is_empty() {
            return None;
        }
        Some(
            items
                .iter()
                .take(format.max_items())
                .map(|item| item.render(&self.details_label))
                .collect(),
        )
    }

    fn render_board(&self, entry: &FeedEntry) -> String {
        let format = ChannelFormat::Board;
        match self.items_or_fallback(entry, format) {
            Some(items) => items.join("\n\n").trim().to_string(),
            None => plain_text_fallback(&entry.summary, format.fallback_chars()),
        }
    }

    fn render_digest(&self, entry: &FeedEntry) -> String {
        let format = ChannelFormat::Digest;
        let title = self.digest_title(&entry.title);
        let body = match self.items_or_fallback(entry, format) {
            Some(items) => items.join("\n"),
            None => plain_text_fallback(&entry.summary, format.fallback_chars()),
        };
        format!(
            "*{}*\n\n{}\n\n*{}:* {}",
            title, body, self.full_content_label, entry.link
        )
    }

    /// Normalize a source title to the daily heading when it carries a date.
    fn digest_title(&self, title: &str) -> String {
        if !self.source_name.is_empty() && !title.contains(&self.source_name) {
            return title.to_string();
        }
        match TITLE_DATE_PATTERN.find(title) {
            Some(date) => format!("{}{}", self.title_prefix, date.as_str()),
            None => title.to_string(),
        }
    }
}
