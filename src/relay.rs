//! Daily relay cycle for newsrelay.
//!
//! Fetches the feed, selects the entries carrying today's heading, filters
//! them by keyword and publishes one message per entry and target channel.

use chrono::NaiveDate;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{ChannelTarget, Config};
use crate::datetime::today_in;
use crate::error::Result;
use crate::publisher::Publisher;
use crate::rss::{include, EntryFormatter, FeedSource};
use crate::slack::OutgoingMessage;
use crate::store::SeenLinkStore;

/// Counts and previews of one cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Entries in the fetched feed.
    pub entries: usize,
    /// Entries carrying today's heading.
    pub matched: usize,
    /// Matched entries dropped by the keyword filter.
    pub filtered_out: usize,
    /// Matched entries skipped because their link was already published.
    pub already_seen: usize,
    /// Messages posted.
    pub published: usize,
    /// Posts that failed.
    pub failed: usize,
    /// Messages composed in dry-run mode.
    pub previews: Vec<OutgoingMessage>,
}

/// One fetch-and-publish job.
pub struct DigestJob {
    source: Arc<dyn FeedSource>,
    publisher: Arc<Publisher>,
    formatter: EntryFormatter,
    targets: Vec<ChannelTarget>,
    keywords: Vec<String>,
    tz: Tz,
    seen_links: Option<Arc<SeenLinkStore>>,
}

impl DigestJob {
    /// Create a new DigestJob.
    pub fn new(
        source: Arc<dyn FeedSource>,
        publisher: Arc<Publisher>,
        formatter: EntryFormatter,
        targets: Vec<ChannelTarget>,
        keywords: Vec<String>,
        tz: Tz,
    ) -> Self {
        Self {
            source,
            publisher,
            formatter,
            targets,
            keywords,
            tz,
            seen_links: None,
        }
    }

    /// Create the job described by `config`.
    pub fn from_config(
        config: &Config,
        source: Arc<dyn FeedSource>,
        publisher: Arc<Publisher>,
    ) -> Result<Self> {
        let mut job = Self::new(
            source,
            publisher,
            EntryFormatter::from_config(&config.feed, &config.message),
            config.slack.targets.clone(),
            config.filter.keywords.clone(),
            config.schedule.tz()?,
        );
        if config.feed.dedupe_links {
            job = job.with_seen_links(Arc::new(SeenLinkStore::new(
                &config.storage.seen_links_path,
            )));
        }
        Ok(job)
    }

    /// Skip entries whose link is in `store` and record published links.
    pub fn with_seen_links(mut self, store: Arc<SeenLinkStore>) -> Self {
        self.seen_links = Some(store);
        self
    }

    /// Run one cycle for today's date in the configured timezone.
    pub async fn run_cycle(&self, dry_run: bool) -> Result<CycleReport> {
        self.run_cycle_on(today_in(&self.tz), dry_run).await
    }

    /// Run one cycle for the daily list of `today`.
    ///
    /// A failed fetch aborts the cycle. A failed post is logged and the
    /// remaining entries and targets are still published.
    pub async fn run_cycle_on(&self, today: NaiveDate, dry_run: bool) -> Result<CycleReport> {
        let heading = self.formatter.daily_heading(today);
        info!(heading = %heading, "Fetching feed");

        let feed = self.source.fetch().await?;
        let mut report = CycleReport {
            entries: feed.entries.len(),
            ..Default::default()
        };
        info!(entries = report.entries, "Feed fetched: {}", feed.title);

        for entry in feed.entries.iter().filter(|e| e.title.contains(&heading)) {
            report.matched += 1;

            if !include(&entry.title, &entry.summary, &self.keywords) {
                debug!(title = %entry.title, "Entry filtered out");
                report.filtered_out += 1;
                continue;
            }

            let key = entry.dedupe_key();
            if let Some(seen) = &self.seen_links {
                if seen.contains(key).await {
                    debug!(key, "Entry already published");
                    report.already_seen += 1;
                    continue;
                }
            }

            info!(
                id = %entry.id,
                published = ?entry.published,
                "Publishing entry: {}", entry.title
            );
            let mut posted = false;
            for target in &self.targets {
                let body = self.formatter.render(entry, target.format);

                if dry_run {
                    report.previews.push(self.publisher.compose(&body, &heading));
                    continue;
                }

                match self.publisher.publish(&body, &target.channel, &heading).await {
                    Ok(_) => {
                        report.published += 1;
                        posted = true;
                    }
                    Err(e) => {
                        error!(channel = %target.channel, "Publish failed: {}", e);
                        report.failed += 1;
                    }
                }
            }

            if posted {
                if let Some(seen) = &self.seen_links {
                    if let Err(e) = seen.insert(key).await {
                        warn!(key, "Failed to record published link: {}", e);
                    }
                }
            }
        }

        if report.matched == 0 {
            info!(heading = %heading, "No entry for today");
        }
        info!(
            matched = report.matched,
            published = report.published,
            failed = report.failed,
            "Cycle finished"
        );
        Ok(report)
    }
}
