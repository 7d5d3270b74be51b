//! Persistent state for newsrelay.
//!
//! Both stores are flat JSON files. Writes go to a sibling temp file that
//! is renamed over the target, so readers see either the old or the new
//! content.

pub mod pending;
pub mod seen_links;

use std::path::Path;

use crate::error::{RelayError, Result};

pub use pending::{JsonFilePendingStore, PendingDelete, PendingDeleteRepository};
pub use seen_links::SeenLinkStore;

/// Replace the file at `path` with `contents`.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let mut tmp_name = path
        .file_name()
        .ok_or_else(|| RelayError::Storage(format!("not a file path: {}", path.display())))?
        .to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, contents).await?;
    tokio::fs::rename(&tmp_path, path).await.map_err(|e| {
        RelayError::Storage(format!(
            "failed to replace {}: {}",
            path.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_atomic_creates_parent_and_leaves_no_temp() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state").join("pending_deletes.json");

        write_atomic(&path, b"[]").await.unwrap();
        write_atomic(&path, b"[1]").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1]");
        assert!(!temp_dir
            .path()
            .join("state")
            .join("pending_deletes.json.tmp")
            .exists());
    }
}
