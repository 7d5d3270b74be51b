//! Test helpers for integration tests.
//!
//! Provides a recording Slack client, a static feed source and store helpers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use newsrelay::rss::{FeedEntry, FeedSource, ParsedFeed};
use newsrelay::slack::{
    Block, DeleteOutcome, HistoryMessage, MessageRef, MessagingClient, SlackError,
};
use newsrelay::store::JsonFilePendingStore;
use newsrelay::{RelayError, Result};

/// A posted message as seen by [`RecordingClient`].
#[derive(Debug, Clone)]
pub struct RecordedPost {
    pub channel: String,
    pub blocks: Vec<Block>,
    pub fallback_text: String,
    pub ts: String,
}

impl RecordedPost {
    /// Text of the section block.
    pub fn body(&self) -> String {
        self.blocks
            .iter()
            .find_map(|block| match block {
                Block::Section { text } => Some(text.text().to_string()),
                _ => None,
            })
            .unwrap_or_default()
    }
}

/// Messaging client that records calls and answers from a script.
#[derive(Default)]
pub struct RecordingClient {
    posts: Mutex<Vec<RecordedPost>>,
    deletes: Mutex<Vec<(String, String)>>,
    delete_results: Mutex<VecDeque<std::result::Result<DeleteOutcome, SlackError>>>,
    failing_channels: Mutex<Vec<String>>,
    history: Mutex<Vec<(String, HistoryMessage)>>,
    bot_user: String,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self {
            bot_user: "UBOT".to_string(),
            ..Default::default()
        }
    }

    /// Queue the result of the next delete call. Unscripted deletes succeed.
    pub fn push_delete_result(&self, result: std::result::Result<DeleteOutcome, SlackError>) {
        self.delete_results.lock().unwrap().push_back(result);
    }

    /// Make every post to `channel` fail.
    pub fn fail_channel(&self, channel: &str) {
        self.failing_channels
            .lock()
            .unwrap()
            .push(channel.to_string());
    }

    /// Add a message to the history of `channel`.
    pub fn add_history(&self, channel: &str, ts: &str, user: Option<&str>) {
        self.history.lock().unwrap().push((
            channel.to_string(),
            HistoryMessage {
                ts: ts.to_string(),
                user: user.map(str::to_string),
                text: String::new(),
            },
        ));
    }

    pub fn posts(&self) -> Vec<RecordedPost> {
        self.posts.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<(String, String)> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingClient for RecordingClient {
    async fn post_message(
        &self,
        channel: &str,
        blocks: &[Block],
        fallback_text: &str,
    ) -> std::result::Result<MessageRef, SlackError> {
        if self
            .failing_channels
            .lock()
            .unwrap()
            .iter()
            .any(|c| c == channel)
        {
            return Err(SlackError::Api("channel_not_found".to_string()));
        }

        let mut posts = self.posts.lock().unwrap();
        let ts = format!("1750816800.{:06}", posts.len() + 1);
        posts.push(RecordedPost {
            channel: channel.to_string(),
            blocks: blocks.to_vec(),
            fallback_text: fallback_text.to_string(),
            ts: ts.clone(),
        });
        Ok(MessageRef {
            channel: channel.to_string(),
            ts,
        })
    }

    async fn delete_message(
        &self,
        channel: &str,
        ts: &str,
    ) -> std::result::Result<DeleteOutcome, SlackError> {
        self.deletes
            .lock()
            .unwrap()
            .push((channel.to_string(), ts.to_string()));
        self.delete_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(DeleteOutcome::Deleted))
    }

    async fn list_history(
        &self,
        channel: &str,
        limit: u32,
    ) -> std::result::Result<Vec<HistoryMessage>, SlackError> {
        Ok(self
            .history
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, m)| m.clone())
            .take(limit as usize)
            .collect())
    }

    async fn auth_test(&self) -> std::result::Result<String, SlackError> {
        Ok(self.bot_user.clone())
    }
}

/// Feed source returning a fixed feed, or an error when empty.
pub struct StaticFeed {
    feed: Option<ParsedFeed>,
}

impl StaticFeed {
    pub fn new(entries: Vec<FeedEntry>) -> Self {
        Self {
            feed: Some(ParsedFeed {
                title: "Test feed".to_string(),
                entries,
            }),
        }
    }

    pub fn unreachable() -> Self {
        Self { feed: None }
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch(&self) -> Result<ParsedFeed> {
        self.feed
            .clone()
            .ok_or_else(|| RelayError::Feed("connection refused".to_string()))
    }
}

/// Build a feed entry.
pub fn entry(title: &str, summary: &str, link: &str) -> FeedEntry {
    FeedEntry {
        id: link.to_string(),
        title: title.to_string(),
        summary: summary.to_string(),
        link: link.to_string(),
        published: None,
    }
}

/// Body with `count` linked numbered items.
pub fn numbered_summary(count: usize) -> String {
    (1..=count)
        .map(|n| format!("{n}/ Headline {n} – <a href=\"https://example.com/{n}\">source</a>"))
        .collect::<Vec<_>>()
        .join("<br>")
}

/// A pending-delete store in a fresh temp directory.
pub fn temp_store() -> (TempDir, Arc<JsonFilePendingStore>) {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFilePendingStore::new(
        temp_dir.path().join("pending_deletes.json"),
    ));
    (temp_dir, store)
}
