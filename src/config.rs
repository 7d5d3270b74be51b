//! Configuration module for newsrelay.

use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;

use crate::rss::ChannelFormat;
use crate::{RelayError, Result};

/// Feed source configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// URL of the RSS feed.
    #[serde(default = "default_feed_url")]
    pub url: String,
    /// Total request timeout in seconds.
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,
    /// Prefix of the daily heading, followed by the date (e.g. `2025/6/25`).
    #[serde(default = "default_title_prefix")]
    pub title_prefix: String,
    /// Digest titles are normalized to the daily heading only when they
    /// contain this name. Empty normalizes every dated title.
    #[serde(default = "default_source_name")]
    pub source_name: String,
    /// Skip entries whose link was already published.
    #[serde(default)]
    pub dedupe_links: bool,
}

fn default_feed_url() -> String {
    "https://rsshub.app/telegram/channel/SoSoValue_CN".to_string()
}

fn default_feed_timeout() -> u64 {
    30
}

fn default_title_prefix() -> String {
    "每日加密热点新闻榜单｜".to_string()
}

fn default_source_name() -> String {
    "SoSoValue".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            timeout_secs: default_feed_timeout(),
            title_prefix: default_title_prefix(),
            source_name: default_source_name(),
            dedupe_links: false,
        }
    }
}

/// A channel the daily digest is posted to.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChannelTarget {
    /// Slack channel ID.
    pub channel: String,
    /// Rendering used for this channel.
    #[serde(default)]
    pub format: ChannelFormat,
}

impl ChannelTarget {
    /// Create a board-format target.
    pub fn board(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            format: ChannelFormat::Board,
        }
    }
}

/// Slack configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    /// Bot token (`xoxb-...`).
    #[serde(default)]
    pub bot_token: String,
    /// Base URL of the Web API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Request timeout in seconds for every API call.
    #[serde(default = "default_slack_timeout")]
    pub timeout_secs: u64,
    /// Channels receiving the digest.
    #[serde(default)]
    pub targets: Vec<ChannelTarget>,
}

fn default_api_base() -> String {
    "https://slack.com/api".to_string()
}

fn default_slack_timeout() -> u64 {
    15
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: default_api_base(),
            timeout_secs: default_slack_timeout(),
            targets: vec![],
        }
    }
}

/// Keyword filter configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FilterConfig {
    /// Keywords; an entry is kept when any of them occurs in title or content.
    /// An empty list keeps everything.
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Schedule configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Time of day (`HH:MM`) of the fetch cycle.
    #[serde(default = "default_schedule_time")]
    pub time: String,
    /// Days the fetch cycle runs on.
    #[serde(default = "default_weekdays")]
    pub weekdays: Vec<String>,
    /// Timezone for the schedule, the daily heading and message footers.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Interval of the retention sweep in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Run one fetch cycle immediately at startup.
    #[serde(default = "default_run_on_start")]
    pub run_on_start: bool,
}

fn default_schedule_time() -> String {
    "10:00".to_string()
}

fn default_weekdays() -> Vec<String> {
    ["mon", "tue", "wed", "thu", "fri"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}

fn default_timezone() -> String {
    "Asia/Shanghai".to_string()
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_run_on_start() -> bool {
    true
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            time: default_schedule_time(),
            weekdays: default_weekdays(),
            timezone: default_timezone(),
            sweep_interval_secs: default_sweep_interval(),
            run_on_start: default_run_on_start(),
        }
    }
}

impl ScheduleConfig {
    /// Parse the configured time of day.
    pub fn time_of_day(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(self.time.trim(), "%H:%M").map_err(|_| {
            RelayError::Config(format!(
                "schedule.time must be HH:MM, got {:?}",
                self.time
            ))
        })
    }

    /// Parse the configured weekdays.
    pub fn weekday_list(&self) -> Result<Vec<Weekday>> {
        self.weekdays
            .iter()
            .map(|d| {
                d.trim()
                    .parse::<Weekday>()
                    .map_err(|_| RelayError::Config(format!("unknown weekday: {d:?}")))
            })
            .collect()
    }

    /// Parse the configured timezone.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| RelayError::Config(format!("unknown timezone: {:?}", self.timezone)))
    }
}

/// Retention configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Age in seconds after which a published message is deleted.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// Pause between consecutive delete calls in milliseconds.
    #[serde(default = "default_delete_delay")]
    pub delete_delay_ms: u64,
    /// Failed deletes before a record is abandoned (0 = retry forever).
    #[serde(default = "default_max_delete_attempts")]
    pub max_delete_attempts: u32,
    /// Backoff after the first failed delete, doubled per further failure.
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: u64,
    /// Upper bound of the backoff.
    #[serde(default = "default_backoff_max")]
    pub backoff_max_secs: u64,
}

fn default_retention_secs() -> u64 {
    172_800 // 48 hours
}

fn default_delete_delay() -> u64 {
    100
}

fn default_max_delete_attempts() -> u32 {
    10
}

fn default_backoff_base() -> u64 {
    60
}

fn default_backoff_max() -> u64 {
    21_600 // 6 hours
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
            delete_delay_ms: default_delete_delay(),
            max_delete_attempts: default_max_delete_attempts(),
            backoff_base_secs: default_backoff_base(),
            backoff_max_secs: default_backoff_max(),
        }
    }
}

/// Persisted state configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding pending deletes.
    #[serde(default = "default_pending_deletes_path")]
    pub pending_deletes_path: String,
    /// JSON file holding already published links.
    #[serde(default = "default_seen_links_path")]
    pub seen_links_path: String,
}

fn default_pending_deletes_path() -> String {
    "pending_deletes.json".to_string()
}

fn default_seen_links_path() -> String {
    "pushed_links.json".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            pending_deletes_path: default_pending_deletes_path(),
            seen_links_path: default_seen_links_path(),
        }
    }
}

/// Labels used in posted messages.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageConfig {
    /// Label of the per-item source link.
    #[serde(default = "default_details_label")]
    pub details_label: String,
    /// Notice appended to every message body.
    #[serde(default = "default_retention_notice")]
    pub retention_notice: String,
    /// Label in front of the generation timestamp.
    #[serde(default = "default_updated_label")]
    pub updated_label: String,
    /// Label in front of the entry link in the digest format.
    #[serde(default = "default_full_content_label")]
    pub full_content_label: String,
}

fn default_details_label() -> String {
    "【详情】".to_string()
}

fn default_retention_notice() -> String {
    "本消息 48 小时后自动删除".to_string()
}

fn default_updated_label() -> String {
    "更新时间".to_string()
}

fn default_full_content_label() -> String {
    "完整内容".to_string()
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            details_label: default_details_label(),
            retention_notice: default_retention_notice(),
            updated_label: default_updated_label(),
            full_content_label: default_full_content_label(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/newsrelay.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Feed source.
    #[serde(default)]
    pub feed: FeedConfig,
    /// Slack connection and targets.
    #[serde(default)]
    pub slack: SlackConfig,
    /// Keyword filter.
    #[serde(default)]
    pub filter: FilterConfig,
    /// Schedule.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Retention sweep.
    #[serde(default)]
    pub retention: RetentionConfig,
    /// Persisted state.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Message labels.
    #[serde(default)]
    pub message: MessageConfig,
    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(RelayError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    ///
    /// A missing file yields the defaults, so a deployment may be configured
    /// through the environment alone.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = if path.as_ref().exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| RelayError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `SLACK_BOT_TOKEN`: bot token
    /// - `NEWSRELAY_CHANNELS`: comma-separated channel IDs (board format)
    /// - `CONTENT_FILTER_KEYWORDS`: comma-separated keywords
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("SLACK_BOT_TOKEN") {
            if !token.is_empty() {
                self.slack.bot_token = token;
            }
        }

        if let Ok(channels) = std::env::var("NEWSRELAY_CHANNELS") {
            let targets: Vec<ChannelTarget> = split_list(&channels)
                .into_iter()
                .map(ChannelTarget::board)
                .collect();
            if !targets.is_empty() {
                self.slack.targets = targets;
            }
        }

        if let Ok(keywords) = std::env::var("CONTENT_FILTER_KEYWORDS") {
            if !keywords.is_empty() {
                self.filter.keywords = split_list(&keywords);
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Every field required to run the relay must be present and well-formed.
    pub fn validate(&self) -> Result<()> {
        if self.slack.bot_token.trim().is_empty() {
            return Err(RelayError::Config(
                "slack.bot_token is not set. \
                 Set it in config.toml or via SLACK_BOT_TOKEN environment variable."
                    .to_string(),
            ));
        }

        if self.slack.targets.is_empty() {
            return Err(RelayError::Config(
                "no target channels configured. \
                 Add [[slack.targets]] to config.toml or set NEWSRELAY_CHANNELS."
                    .to_string(),
            ));
        }

        if self
            .slack
            .targets
            .iter()
            .any(|target| target.channel.trim().is_empty())
        {
            return Err(RelayError::Config(
                "slack.targets contains an empty channel ID".to_string(),
            ));
        }

        let feed_url = url::Url::parse(&self.feed.url)
            .map_err(|e| RelayError::Config(format!("feed.url is invalid: {e}")))?;
        if !matches!(feed_url.scheme(), "http" | "https") {
            return Err(RelayError::Config(format!(
                "feed.url must use http or https, got {}",
                feed_url.scheme()
            )));
        }

        self.schedule.time_of_day()?;
        self.schedule.weekday_list()?;
        self.schedule.tz()?;

        if self.schedule.sweep_interval_secs == 0 {
            return Err(RelayError::Config(
                "schedule.sweep_interval_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Split a comma-separated list, dropping blank items.
fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}
