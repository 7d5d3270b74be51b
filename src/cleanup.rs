//! Removal of the bot's own messages from channel history.
//!
//! Unlike the retention sweep this does not consult the pending-delete
//! store. It covers messages posted before the store existed or lost from it.

use std::time::Duration;
use tracing::{info, warn};

use crate::error::Result;
use crate::slack::{DeleteOutcome, MessagingClient};

/// Result of cleaning one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelCleanup {
    /// Channel ID.
    pub channel: String,
    /// Messages deleted.
    pub deleted: usize,
    /// Messages that were already gone.
    pub already_gone: usize,
    /// Deletes that failed.
    pub failed: usize,
}

/// Delete the bot's messages among the latest `limit` messages of each channel.
pub async fn purge_bot_history(
    client: &dyn MessagingClient,
    channels: &[String],
    limit: u32,
    delay: Duration,
) -> Result<Vec<ChannelCleanup>> {
    let bot_user = client.auth_test().await?;
    info!(user = %bot_user, "Authenticated");

    let mut results = Vec::with_capacity(channels.len());
    let mut calls = 0usize;

    for channel in channels {
        let mut result = ChannelCleanup {
            channel: channel.clone(),
            ..Default::default()
        };

        let history = match client.list_history(channel, limit).await {
            Ok(history) => history,
            Err(e) => {
                warn!(channel = %channel, "Failed to list history: {}", e);
                results.push(result);
                continue;
            }
        };

        let own: Vec<_> = history
            .into_iter()
            .filter(|m| m.user.as_deref() == Some(bot_user.as_str()))
            .collect();
        info!(channel = %channel, count = own.len(), "Deleting bot messages");

        for message in own {
            if calls > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            calls += 1;

            match client.delete_message(channel, &message.ts).await {
                Ok(DeleteOutcome::Deleted) => result.deleted += 1,
                Ok(DeleteOutcome::AlreadyGone) => result.already_gone += 1,
                Err(e) => {
                    warn!(channel = %channel, ts = %message.ts, "Delete failed: {}", e);
                    result.failed += 1;
                }
            }
        }

        info!(
            channel = %channel,
            deleted = result.deleted,
            already_gone = result.already_gone,
            failed = result.failed,
            "Channel cleaned"
        );
        results.push(result);
    }

    Ok(results)
}
