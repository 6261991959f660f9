//! Snapshot persistence collaborator.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::process::ProcessMap;

/// Persistence error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sink for received process snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist the snapshot, replacing any previously stored one.
    ///
    /// # Errors
    /// Returns an error if the snapshot cannot be written.
    async fn store(&self, tasks: &ProcessMap) -> Result<(), StoreError>;
}

/// Stores the most recent snapshot as an indented JSON file.
///
/// Writes to a sibling temp file and renames over the target, so a reader
/// never observes a half-written snapshot.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target path of the stored snapshot.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(".tmp");
        PathBuf::from(os)
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn store(&self, tasks: &ProcessMap) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(tasks)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
