//! Feed fetcher.
//!
//! Fetches the feed with browser-like headers and, when that request fails,
//! retries once with a plain client before giving up.

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{RelayError, Result};
use crate::rss::types::{FeedEntry, ParsedFeed, MAX_FEED_SIZE};

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Browser user agent; some feed proxies reject library user agents.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const FEED_ACCEPT: &str = "application/rss+xml, application/xml, text/xml, */*";

const FEED_ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// Source of feed documents.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse the feed.
    async fn fetch(&self) -> Result<ParsedFeed>;
}

/// HTTP feed fetcher with a fallback request path.
pub struct HttpFeedFetcher {
    url: String,
    client: Client,
    fallback: Client,
}

impl HttpFeedFetcher {
    /// Create a fetcher for `url` with a total request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(FEED_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(FEED_ACCEPT_LANGUAGE));

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| RelayError::Feed(format!("failed to create HTTP client: {e}")))?;

        let fallback = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Feed(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            client,
            fallback,
        })
    }

    async fn download(&self, client: &Client) -> Result<Vec<u8>> {
        let response = client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| RelayError::Feed(format!("failed to fetch feed: {e}")))?;

        if !response.status().is_success() {
            return Err(RelayError::Feed(format!("HTTP error: {}", response.status())));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > MAX_FEED_SIZE {
                return Err(feed_too_large(content_length));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RelayError::Feed(format!("failed to read response: {e}")))?;

        if bytes.len() as u64 > MAX_FEED_SIZE {
            return Err(feed_too_large(bytes.len() as u64));
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl FeedSource for HttpFeedFetcher {
    async fn fetch(&self) -> Result<ParsedFeed> {
        let bytes = match self.download(&self.client).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Feed request failed, retrying with plain client: {}", e);
                self.download(&self.fallback).await.map_err(|e2| {
                    warn!("Fallback feed request failed: {}", e2);
                    e2
                })?
            }
        };

        debug!("Fetched {} bytes from {}", bytes.len(), self.url);
        parse_feed(&bytes)
    }
}

fn feed_too_large(size: u64) -> RelayError {
    RelayError::Feed(format!(
        "feed too large: {size} bytes (max {MAX_FEED_SIZE} bytes)"
    ))
}

/// Parse feed bytes into a ParsedFeed.
///
/// Entry bodies are kept raw; the extractor needs the markup.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(RelayError::Feed("feed payload is empty".to_string()));
    }

    let feed = parser::parse(bytes)
        .map_err(|e| RelayError::Feed(format!("failed to parse feed: {e}")))?;

    let title = feed
        .title
        .map(|t| t.content)
        .unwrap_or_else(|| "Untitled Feed".to_string());

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default();
            let summary = entry
                .summary
                .map(|t| t.content)
                .or(entry.content.and_then(|c| c.body))
                .unwrap_or_default();

            FeedEntry {
                id: entry.id,
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                summary,
                link,
                published: entry.published.or(entry.updated),
            }
        })
        .collect();

    Ok(ParsedFeed { title, entries })
}
