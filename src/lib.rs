//! newsrelay - RSS digest relay for Slack
//!
//! Fetches a news feed, posts the day's numbered headlines to Slack channels
//! and deletes the posted messages once their retention window has passed.

pub mod cleanup;
pub mod config;
pub mod datetime;
pub mod error;
pub mod logging;
pub mod publisher;
pub mod relay;
pub mod rss;
pub mod scheduler;
pub mod slack;
pub mod store;
pub mod sweeper;

pub use cleanup::{purge_bot_history, ChannelCleanup};
pub use config::Config;
pub use error::{RelayError, Result};
pub use publisher::Publisher;
pub use relay::{CycleReport, DigestJob};
pub use scheduler::Scheduler;
pub use sweeper::{RetentionPolicy, RetentionSweeper, SweepReport};
