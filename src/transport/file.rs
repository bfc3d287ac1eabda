//! JSON file transport
//!
//! Re-reads both files on every call, so editing them on disk simulates
//! a changing registry. Meant for local inspection and tests.
//!
//! The delta file's `changes` array is the emission order; events are
//! filtered by timestamp but never reordered.

use crate::error::{RegCacheError, RegCacheResult};
use crate::registry::{DeltaRegistry, Snapshot};
use crate::transport::RegistryTransport;
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

/// Transport backed by a full-snapshot file and a delta file
#[derive(Debug, Clone)]
pub struct FileTransport {
    full_path: PathBuf,
    delta_path: PathBuf,
}

impl FileTransport {
    pub fn new(full_path: impl Into<PathBuf>, delta_path: impl Into<PathBuf>) -> Self {
        Self {
            full_path: full_path.into(),
            delta_path: delta_path.into(),
        }
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> RegCacheResult<T> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| RegCacheError::io(format!("reading {}", path.display()), e))?;

        serde_json::from_str(&content)
            .map_err(|e| RegCacheError::malformed(path.display().to_string(), e.to_string()))
    }
}

#[async_trait]
impl RegistryTransport for FileTransport {
    async fn fetch_full_registry(&self) -> RegCacheResult<Snapshot> {
        let snapshot: Snapshot = Self::read_json(&self.full_path).await?;
        snapshot.validate()?;
        debug!(
            "Read full registry from {}: {} instances",
            self.full_path.display(),
            snapshot.total_count()
        );
        Ok(snapshot)
    }

    async fn fetch_delta_registry(&self, window: Duration) -> RegCacheResult<DeltaRegistry> {
        let mut delta: DeltaRegistry = Self::read_json(&self.delta_path).await?;

        let window = chrono::Duration::from_std(window)
            .map_err(|e| RegCacheError::Internal(format!("delta window out of range: {e}")))?;
        let cutoff = Utc::now() - window;
        let before = delta.changes.len();
        delta.changes.retain(|c| c.changed_at >= cutoff);

        debug!(
            "Read delta from {}: {} of {} events inside window",
            self.delta_path.display(),
            delta.changes.len(),
            before
        );
        Ok(delta)
    }

    fn transport_name(&self) -> &'static str {
        "file"
    }
}
