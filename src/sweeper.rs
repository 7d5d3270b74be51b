//! Retention sweeper for newsrelay.
//!
//! A sweep loads every pending delete, deletes the messages whose retention
//! window has passed and writes back the survivors in one replace.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::RetentionConfig;
use crate::datetime::unix_now;
use crate::error::Result;
use crate::slack::{DeleteOutcome, MessagingClient, SlackError};
use crate::store::{PendingDelete, PendingDeleteRepository};

/// When and how persistently messages are deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionPolicy {
    /// Age in seconds at which a message is deleted.
    pub retention_secs: f64,
    /// Pause between consecutive delete calls.
    pub delete_delay: Duration,
    /// Failed attempts before a record is abandoned; 0 retries forever.
    pub max_attempts: u32,
    /// Backoff after the first failure.
    pub backoff_base_secs: u64,
    /// Backoff ceiling.
    pub backoff_max_secs: u64,
}

impl RetentionPolicy {
    /// Build the policy from configuration.
    pub fn from_config(config: &RetentionConfig) -> Self {
        Self {
            retention_secs: config.retention_secs as f64,
            delete_delay: Duration::from_millis(config.delete_delay_ms),
            max_attempts: config.max_delete_attempts,
            backoff_base_secs: config.backoff_base_secs,
            backoff_max_secs: config.backoff_max_secs,
        }
    }

    /// Wait after the `attempts`-th consecutive failure.
    pub fn backoff_secs(&self, attempts: u32) -> u64 {
        let factor = 1u64
            .checked_shl(attempts.saturating_sub(1))
            .unwrap_or(u64::MAX);
        self.backoff_base_secs
            .saturating_mul(factor)
            .min(self.backoff_max_secs)
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts > 0 && attempts >= self.max_attempts
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from_config(&RetentionConfig::default())
    }
}

/// Counts of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Records looked at.
    pub examined: usize,
    /// Messages deleted.
    pub deleted: usize,
    /// Messages that were already gone.
    pub already_gone: usize,
    /// Records kept because they are too young or backing off.
    pub waiting: usize,
    /// Failed deletes kept for a later sweep.
    pub failed: usize,
    /// Failed deletes dropped after the last allowed attempt.
    pub abandoned: usize,
}

impl SweepReport {
    /// Records left in the store after the sweep.
    pub fn remaining(&self) -> usize {
        self.waiting + self.failed
    }
}

/// Deletes expired messages recorded in the pending-delete store.
///
/// The store lock is not held across the delete calls. Records appended
/// meanwhile survive the write-back, but sweeps and purges of one store
/// must not overlap each other.
pub struct RetentionSweeper {
    client: Arc<dyn MessagingClient>,
    store: Arc<dyn PendingDeleteRepository>,
    policy: RetentionPolicy,
}

impl RetentionSweeper {
    /// Create a new RetentionSweeper.
    pub fn new(
        client: Arc<dyn MessagingClient>,
        store: Arc<dyn PendingDeleteRepository>,
        policy: RetentionPolicy,
    ) -> Self {
        Self {
            client,
            store,
            policy,
        }
    }

    /// Sweep at the current time.
    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(unix_now()).await
    }

    /// Sweep as if the current unix time were `now`.
    pub async fn sweep_at(&self, now: f64) -> Result<SweepReport> {
        let records = self.store.load_all().await?;
        let mut report = SweepReport::default();
        if records.is_empty() {
            debug!("No pending deletes");
            return Ok(report);
        }

        let examined = records.len();
        let mut survivors = Vec::with_capacity(examined);
        let mut calls = 0usize;

        for mut record in records {
            report.examined += 1;
            let age = record.age_at(now);

            if age < self.policy.retention_secs {
                info!(
                    channel = %record.channel,
                    ts = %record.ts,
                    "Kept, {:.1}h until deletion",
                    (self.policy.retention_secs - age) / 3600.0
                );
                report.waiting += 1;
                survivors.push(record);
                continue;
            }

            if let Some(next) = record.next_attempt_at {
                if next > now {
                    info!(
                        channel = %record.channel,
                        ts = %record.ts,
                        attempts = record.attempts,
                        "Backing off, next attempt in {:.0}s",
                        next - now
                    );
                    report.waiting += 1;
                    survivors.push(record);
                    continue;
                }
            }

            if calls > 0 && !self.policy.delete_delay.is_zero() {
                tokio::time::sleep(self.policy.delete_delay).await;
            }
            calls += 1;

            info!(
                channel = %record.channel,
                ts = %record.ts,
                "Deleting message, age {:.1}h",
                age / 3600.0
            );

            match self.client.delete_message(&record.channel, &record.ts).await {
                Ok(DeleteOutcome::Deleted) => {
                    info!(channel = %record.channel, ts = %record.ts, "Message deleted");
                    report.deleted += 1;
                }
                Ok(DeleteOutcome::AlreadyGone) => {
                    info!(channel = %record.channel, ts = %record.ts, "Message already gone");
                    report.already_gone += 1;
                }
                Err(e) => {
                    record.attempts = record.attempts.saturating_add(1);
                    if self.policy.exhausted(record.attempts) {
                        error!(
                            channel = %record.channel,
                            ts = %record.ts,
                            attempts = record.attempts,
                            "Delete abandoned: {}", e
                        );
                        report.abandoned += 1;
                        continue;
                    }

                    let mut wait = self.policy.backoff_secs(record.attempts);
                    if let SlackError::RateLimited { retry_after_secs } = e {
                        wait = wait.max(retry_after_secs);
                    }
                    record.next_attempt_at = Some(now + wait as f64);
                    warn!(
                        channel = %record.channel,
                        ts = %record.ts,
                        attempts = record.attempts,
                        "Delete failed, retrying in {}s: {}", wait, e
                    );
                    report.failed += 1;
                    survivors.push(record);
                }
            }
        }

        self.store.compact(examined, &survivors).await?;

        info!(
            examined = report.examined,
            deleted = report.deleted,
            already_gone = report.already_gone,
            waiting = report.waiting,
            failed = report.failed,
            abandoned = report.abandoned,
            "Sweep finished"
        );
        Ok(report)
    }

    /// Delete every recorded message regardless of age and empty the store.
    pub async fn purge(&self) -> Result<SweepReport> {
        let records = self.store.load_all().await?;
        let mut report = SweepReport::default();

        for (i, record) in records.iter().enumerate() {
            if i > 0 && !self.policy.delete_delay.is_zero() {
                tokio::time::sleep(self.policy.delete_delay).await;
            }
            report.examined += 1;

            match self.client.delete_message(&record.channel, &record.ts).await {
                Ok(DeleteOutcome::Deleted) => report.deleted += 1,
                Ok(DeleteOutcome::AlreadyGone) => report.already_gone += 1,
                Err(e) => {
                    warn!(channel = %record.channel, ts = %record.ts, "Delete failed: {}", e);
                    report.abandoned += 1;
                }
            }
        }

        self.store.replace_all(&[]).await?;

        info!(
            deleted = report.deleted,
            already_gone = report.already_gone,
            failed = report.abandoned,
            "Purge finished"
        );
        Ok(report)
    }
}
