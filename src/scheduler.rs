//! Run loop for newsrelay.
//!
//! One task drives both the weekday publish cycle and the periodic
//! retention sweep. Work is never cancelled midway: the shutdown signal is
//! only observed while waiting for the next timer.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::config::ScheduleConfig;
use crate::datetime::{format_in_tz, next_run_after};
use crate::error::Result;
use crate::relay::DigestJob;
use crate::sweeper::RetentionSweeper;

enum Wake {
    Publish,
    Sweep,
    Shutdown,
}

/// Drives the publish cycle and the retention sweep.
pub struct Scheduler {
    job: Arc<DigestJob>,
    sweeper: Arc<RetentionSweeper>,
    tz: Tz,
    at: NaiveTime,
    weekdays: Vec<Weekday>,
    sweep_interval: Duration,
    run_on_start: bool,
    first_publish: Option<DateTime<Utc>>,
}

impl Scheduler {
    /// Create a scheduler from the schedule configuration.
    pub fn new(
        job: Arc<DigestJob>,
        sweeper: Arc<RetentionSweeper>,
        schedule: &ScheduleConfig,
    ) -> Result<Self> {
        Ok(Self {
            job,
            sweeper,
            tz: schedule.tz()?,
            at: schedule.time_of_day()?,
            weekdays: schedule.weekday_list()?,
            sweep_interval: Duration::from_secs(schedule.sweep_interval_secs.max(1)),
            run_on_start: schedule.run_on_start,
            first_publish: None,
        })
    }

    /// Publish first at `at` instead of the next scheduled time.
    pub fn with_first_publish(mut self, at: DateTime<Utc>) -> Self {
        self.first_publish = Some(at);
        self
    }

    fn next_publish_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let next = next_run_after(after, &self.tz, self.at, &self.weekdays);
        if let Some(next) = next {
            info!(
                "Next publish at {}",
                format_in_tz(&next, &self.tz, "%Y-%m-%d %H:%M %Z")
            );
        }
        next
    }

    /// Run until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            at = %self.at.format("%H:%M"),
            weekdays = ?self.weekdays,
            timezone = %self.tz,
            sweep_interval_secs = self.sweep_interval.as_secs(),
            "Scheduler started"
        );

        if self.run_on_start {
            self.publish().await;
            self.sweep().await;
        }

        let mut timer = tokio::time::interval(self.sweep_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // Skip first tick (immediate)
        timer.tick().await;

        // The deadline survives loop passes, so a publish that comes due
        // while a sweep is running still happens, late.
        let mut next_publish = match self.first_publish {
            Some(at) => Some(at),
            None => self.next_publish_after(Utc::now()),
        };

        loop {
            let until_next = next_publish
                .map(|deadline| time_until(deadline, Utc::now()))
                .unwrap_or(Duration::ZERO);

            let wake = tokio::select! {
                biased;
                _ = &mut shutdown => Wake::Shutdown,
                _ = tokio::time::sleep(until_next), if next_publish.is_some() => Wake::Publish,
                _ = timer.tick() => Wake::Sweep,
            };

            match wake {
                Wake::Publish => {
                    if let Some(deadline) = next_publish {
                        let late = (Utc::now() - deadline).num_seconds();
                        if late > 0 {
                            warn!("Scheduled publish is {}s late", late);
                        }
                    }
                    self.publish().await;
                    next_publish = self.next_publish_after(Utc::now());
                }
                Wake::Sweep => self.sweep().await,
                Wake::Shutdown => {
                    info!("Shutdown requested, scheduler stopped");
                    break;
                }
            }
        }
    }

    async fn publish(&self) {
        match self.job.run_cycle(false).await {
            Ok(report) if report.failed > 0 => {
                warn!(failed = report.failed, "Cycle finished with failed posts")
            }
            Ok(_) => {}
            Err(e) => error!("Publish cycle failed: {}", e),
        }
    }

    async fn sweep(&self) {
        if let Err(e) = self.sweeper.sweep().await {
            error!("Retention sweep failed: {}", e);
        }
    }
}

/// Time left until `deadline`; zero once it has passed.
fn time_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (deadline - now).to_std().unwrap_or(Duration::ZERO)
}
