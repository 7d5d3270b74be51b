//! Publisher for newsrelay.
//!
//! Posts formatted bodies as block messages and records every posted
//! message in the pending-delete store.

use chrono::Utc;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::MessageConfig;
use crate::datetime::{format_in_tz, unix_now};
use crate::error::Result;
use crate::slack::{MessageRef, MessagingClient, OutgoingMessage};
use crate::store::{PendingDelete, PendingDeleteRepository};

/// Footer timestamp format.
const FOOTER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Posts messages and schedules their deletion.
pub struct Publisher {
    client: Arc<dyn MessagingClient>,
    store: Arc<dyn PendingDeleteRepository>,
    retention_notice: String,
    updated_label: String,
    tz: Tz,
}

impl Publisher {
    /// Create a new Publisher.
    pub fn new(
        client: Arc<dyn MessagingClient>,
        store: Arc<dyn PendingDeleteRepository>,
        message: &MessageConfig,
        tz: Tz,
    ) -> Self {
        Self {
            client,
            store,
            retention_notice: message.retention_notice.clone(),
            updated_label: message.updated_label.clone(),
            tz,
        }
    }

    /// Build the message for `text` without sending it.
    pub fn compose(&self, text: &str, title: &str) -> OutgoingMessage {
        let now = Utc::now();
        OutgoingMessage {
            title: title.to_string(),
            body: format!("{}\n\n\n{}", text.trim(), self.retention_notice),
            footer: format!(
                "{}: {}",
                self.updated_label,
                format_in_tz(&now, &self.tz, FOOTER_TIME_FORMAT)
            ),
        }
    }

    /// Post `text` to `channel` under `title`.
    ///
    /// A successful post is appended to the pending-delete store. A failed
    /// post is returned as is and leaves the store untouched.
    pub async fn publish(&self, text: &str, channel: &str, title: &str) -> Result<MessageRef> {
        let message = self.compose(text, title);

        let posted = match self
            .client
            .post_message(channel, &message.blocks(), &message.title)
            .await
        {
            Ok(posted) => posted,
            Err(e) => {
                error!(channel, "Failed to post message: {}", e);
                return Err(e.into());
            }
        };
        info!(channel, ts = %posted.ts, "Message posted");

        self.store
            .append(PendingDelete::new(channel, &posted.ts, unix_now()))
            .await?;

        Ok(posted)
    }
}
