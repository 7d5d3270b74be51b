//! Integration tests for the scheduler loop.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;

use common::{entry, numbered_summary, temp_store, RecordingClient, StaticFeed};
use newsrelay::config::{ChannelTarget, MessageConfig, ScheduleConfig};
use newsrelay::datetime::{today_in, unix_now};
use newsrelay::rss::EntryFormatter;
use newsrelay::store::{PendingDelete, PendingDeleteRepository};
use newsrelay::{DigestJob, Publisher, RetentionPolicy, RetentionSweeper, Scheduler};

const TZ: Tz = chrono_tz::Asia::Shanghai;

fn schedule(run_on_start: bool) -> ScheduleConfig {
    ScheduleConfig {
        timezone: "Asia/Shanghai".to_string(),
        run_on_start,
        ..Default::default()
    }
}

fn scheduler(
    client: Arc<RecordingClient>,
    store: Arc<dyn PendingDeleteRepository>,
    run_on_start: bool,
) -> Scheduler {
    scheduler_with(client, store, schedule(run_on_start), Duration::ZERO)
}

fn scheduler_with(
    client: Arc<RecordingClient>,
    store: Arc<dyn PendingDeleteRepository>,
    schedule: ScheduleConfig,
    delete_delay: Duration,
) -> Scheduler {
    let formatter = EntryFormatter::new("Daily | ", "[details]", "Full text");
    let heading = formatter.daily_heading(today_in(&TZ));
    let feed = StaticFeed::new(vec![entry(
        &heading,
        &numbered_summary(3),
        "https://t.me/news/1",
    )]);
    let publisher = Arc::new(Publisher::new(
        client.clone(),
        store.clone(),
        &MessageConfig::default(),
        TZ,
    ));
    let job = DigestJob::new(
        Arc::new(feed),
        publisher,
        formatter,
        vec![ChannelTarget::board("C1")],
        vec![],
        TZ,
    );
    let sweeper = RetentionSweeper::new(
        client,
        store,
        RetentionPolicy {
            delete_delay,
            ..RetentionPolicy::default()
        },
    );
    Scheduler::new(Arc::new(job), Arc::new(sweeper), &schedule).unwrap()
}

#[tokio::test]
async fn test_run_on_start_then_shutdown() {
    let (_dir, store) = temp_store();
    let client = Arc::new(RecordingClient::new());
    store
        .append(PendingDelete::new("C0", "0.1", unix_now() - 200_000.0))
        .await
        .unwrap();

    scheduler(client.clone(), store.clone(), true)
        .run(std::future::ready(()))
        .await;

    assert_eq!(client.posts().len(), 1);
    assert_eq!(client.deletes(), vec![("C0".to_string(), "0.1".to_string())]);

    let records = store.load_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].channel, "C1");
}

#[tokio::test]
async fn test_shutdown_without_run_on_start_does_nothing() {
    let (_dir, store) = temp_store();
    let client = Arc::new(RecordingClient::new());

    tokio::time::timeout(
        Duration::from_secs(5),
        scheduler(client.clone(), store, false).run(std::future::ready(())),
    )
    .await
    .unwrap();

    assert!(client.posts().is_empty());
}

#[tokio::test]
async fn test_publish_due_during_sweep_runs_late() {
    let (_dir, store) = temp_store();
    let client = Arc::new(RecordingClient::new());
    let expired = unix_now() - 200_000.0;
    let records: Vec<PendingDelete> = (0..10)
        .map(|i| PendingDelete::new("C0", format!("0.{i}"), expired))
        .collect();
    store.replace_all(&records).await.unwrap();

    // The sweep starts after 1s and takes about 2.7s, so the publish
    // deadline at 1.5s passes while it runs.
    let config = ScheduleConfig {
        sweep_interval_secs: 1,
        ..schedule(false)
    };
    let deadline = chrono::Utc::now() + chrono::Duration::milliseconds(1500);
    scheduler_with(
        client.clone(),
        store.clone(),
        config,
        Duration::from_millis(300),
    )
    .with_first_publish(deadline)
    .run(tokio::time::sleep(Duration::from_secs(6)))
    .await;

    assert_eq!(client.deletes().len(), 10);
    assert_eq!(client.posts().len(), 1);

    let records = store.load_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].channel, "C1");
}

#[test]
fn test_invalid_schedule_rejected() {
    let (_dir, store) = temp_store();
    let client = Arc::new(RecordingClient::new());
    let job = DigestJob::new(
        Arc::new(StaticFeed::new(vec![])),
        Arc::new(Publisher::new(
            client.clone(),
            store.clone(),
            &MessageConfig::default(),
            TZ,
        )),
        EntryFormatter::new("", "", ""),
        vec![],
        vec![],
        TZ,
    );
    let sweeper = RetentionSweeper::new(client, store, RetentionPolicy::default());
    let bad = ScheduleConfig {
        time: "25:99".to_string(),
        ..Default::default()
    };

    assert!(Scheduler::new(Arc::new(job), Arc::new(sweeper), &bad).is_err());
}
