//! Pending-delete records and their JSON file store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::Result;
use crate::store::write_atomic;

/// A posted message waiting for its retention window to pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDelete {
    /// Channel the message lives in.
    pub channel: String,
    /// Platform message timestamp.
    pub ts: String,
    /// Unix time (seconds) the message was posted.
    pub send_time: f64,
    /// Failed delete attempts so far.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub attempts: u32,
    /// Earliest unix time of the next delete attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<f64>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl PendingDelete {
    /// Record for a message posted at `send_time`.
    pub fn new(channel: impl Into<String>, ts: impl Into<String>, send_time: f64) -> Self {
        Self {
            channel: channel.into(),
            ts: ts.into(),
            send_time,
            attempts: 0,
            next_attempt_at: None,
        }
    }

    /// Seconds since the message was posted.
    pub fn age_at(&self, now: f64) -> f64 {
        now - self.send_time
    }
}

/// Storage for pending-delete records.
///
/// The store is the single source of truth; callers never cache records
/// across operations.
#[async_trait]
pub trait PendingDeleteRepository: Send + Sync {
    /// All records in store order. Missing or unreadable state is empty.
    async fn load_all(&self) -> Result<Vec<PendingDelete>>;

    /// Replace the stored sequence with exactly `records`.
    async fn replace_all(&self, records: &[PendingDelete]) -> Result<()>;

    /// Append one record.
    async fn append(&self, record: PendingDelete) -> Result<()>;

    /// Replace the first `examined` records with `survivors`.
    ///
    /// Records appended after those were loaded are kept behind the
    /// survivors, so a publish during a sweep is not lost.
    async fn compact(&self, examined: usize, survivors: &[PendingDelete]) -> Result<()>;
}

/// Pending deletes kept as a JSON array in a single file.
pub struct JsonFilePendingStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFilePendingStore {
    /// Create a store backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Vec<PendingDelete> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), "Failed to read pending deletes: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    "Pending deletes file is corrupt, treating as empty: {}", e
                );
                Vec::new()
            }
        }
    }

    async fn write(&self, records: &[PendingDelete]) -> Result<()> {
        let json = serde_json::to_vec_pretty(records)?;
        write_atomic(&self.path, &json).await
    }
}

#[async_trait]
impl PendingDeleteRepository for JsonFilePendingStore {
    async fn load_all(&self) -> Result<Vec<PendingDelete>> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await)
    }

    async fn replace_all(&self, records: &[PendingDelete]) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.write(records).await
    }

    async fn append(&self, record: PendingDelete) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.read().await;
        records.push(record);
        self.write(&records).await
    }

    async fn compact(&self, examined: usize, survivors: &[PendingDelete]) -> Result<()> {
        let _guard = self.lock.lock().await;
        let current = self.read().await;
        let mut records = survivors.to_vec();
        records.extend(current.into_iter().skip(examined));
        self.write(&records).await
    }
}
