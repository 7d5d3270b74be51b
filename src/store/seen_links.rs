//! Links that were already published, for optional dedupe.

use std::collections::BTreeSet;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::Result;
use crate::store::write_atomic;

/// A set of links kept as a JSON array of strings.
pub struct SeenLinkStore {
    path: PathBuf,
    links: Mutex<Option<BTreeSet<String>>>,
}

impl SeenLinkStore {
    /// Create a store backed by `path`; the file is read on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            links: Mutex::new(None),
        }
    }

    async fn read(&self) -> BTreeSet<String> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice::<Vec<String>>(&bytes)
                .map(|links| links.into_iter().collect())
                .unwrap_or_else(|e| {
                    warn!(path = %self.path.display(), "Seen links file is corrupt: {}", e);
                    BTreeSet::new()
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                warn!(path = %self.path.display(), "Failed to read seen links: {}", e);
                BTreeSet::new()
            }
        }
    }

    /// Whether `link` was recorded before.
    pub async fn contains(&self, link: &str) -> bool {
        let mut links = self.links.lock().await;
        if links.is_none() {
            *links = Some(self.read().await);
        }
        matches!(&*links, Some(set) if set.contains(link))
    }

    /// Record `link` and persist the set.
    pub async fn insert(&self, link: &str) -> Result<()> {
        let mut links = self.links.lock().await;
        let mut set = match links.take() {
            Some(set) => set,
            None => self.read().await,
        };

        let added = set.insert(link.to_string());
        let result = if added {
            match serde_json::to_vec_pretty(&set) {
                Ok(json) => write_atomic(&self.path, &json).await,
                Err(e) => Err(e.into()),
            }
        } else {
            Ok(())
        };

        *links = Some(set);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_insert_and_contains() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pushed_links.json");
        let store = SeenLinkStore::new(&path);

        assert!(!store.contains("https://t.me/a/1").await);
        store.insert("https://t.me/a/1").await.unwrap();
        assert!(store.contains("https://t.me/a/1").await);

        // A fresh store reads the persisted set
        let reopened = SeenLinkStore::new(&path);
        assert!(reopened.contains("https://t.me/a/1").await);
        assert!(!reopened.contains("https://t.me/a/2").await);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pushed_links.json");
        std::fs::write(&path, "not json").unwrap();

        let store = SeenLinkStore::new(&path);
        assert!(!store.contains("x").await);
        store.insert("x").await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let list: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(list, vec!["x".to_string()]);
    }
}
