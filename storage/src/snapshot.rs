use crate::records::{RecordsError, StoreRecords};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use wayfinder_core::error::{ErrorCode, WayfinderError};

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no snapshot found in {0}")]
    Missing(PathBuf),
    #[error("snapshot {path} is unreadable: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: RecordsError,
    },
    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] RecordsError),
}

impl WayfinderError for SnapshotError {
    fn error_code(&self) -> ErrorCode {
        match self {
            SnapshotError::Io(_) => ErrorCode::Internal,
            SnapshotError::Missing(_) => ErrorCode::FailedPrecondition,
            SnapshotError::Corrupt { .. } => ErrorCode::FailedPrecondition,
            SnapshotError::Encode(_) => ErrorCode::Internal,
        }
    }
}

/// Versioned snapshot files `snapshot_{version:020}.rkyv` in one directory.
pub struct SnapshotManager {
    dir: PathBuf,
}

impl SnapshotManager {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `records` as the given version.
    /// Atomically writes to a temp file then renames.
    pub async fn create_snapshot(
        &self,
        version: u64,
        records: &StoreRecords,
    ) -> Result<PathBuf, SnapshotError> {
        fs::create_dir_all(&self.dir).await?;

        let data = records.encode()?;
        let path = self.dir.join(format!("snapshot_{:020}.rkyv", version));
        let tmp_path = path.with_extension("tmp");

        fs::write(&tmp_path, &data).await?;
        fs::rename(&tmp_path, &path).await?;

        tracing::info!(
            version,
            path = %path.display(),
            locations = records.locations.len(),
            products = records.products.len(),
            connections = records.connections.len(),
            embeddings = records.embeddings.len(),
            "snapshot written"
        );
        Ok(path)
    }

    /// Write `records` one version above the latest.
    pub async fn publish(&self, records: &StoreRecords) -> Result<(u64, PathBuf), SnapshotError> {
        let next = match self.latest_snapshot().await? {
            Some((version, _)) => version + 1,
            None => 1,
        };
        let path = self.create_snapshot(next, records).await?;
        Ok((next, path))
    }

    /// Find the latest snapshot file (highest version).
    pub async fn latest_snapshot(&self) -> Result<Option<(u64, PathBuf)>, SnapshotError> {
        if !fs::try_exists(&self.dir).await? {
            return Ok(None);
        }

        let mut entries = fs::read_dir(&self.dir).await?;
        let mut latest: Option<(u64, PathBuf)> = None;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(version) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_version)
            else {
                continue;
            };
            if latest.as_ref().is_none_or(|(max, _)| version > *max) {
                latest = Some((version, path));
            }
        }

        Ok(latest)
    }

    pub async fn read_snapshot(&self, path: impl AsRef<Path>) -> Result<StoreRecords, SnapshotError> {
        let path = path.as_ref();
        let bytes = fs::read(path).await?;
        StoreRecords::decode(&bytes).map_err(|source| SnapshotError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the live snapshot. Absence is an error, never an empty catalog.
    pub async fn load_latest(&self) -> Result<(u64, StoreRecords), SnapshotError> {
        let (version, path) = self
            .latest_snapshot()
            .await?
            .ok_or_else(|| SnapshotError::Missing(self.dir.clone()))?;
        let records = self.read_snapshot(&path).await?;
        tracing::info!(version, path = %path.display(), "snapshot loaded");
        Ok((version, records))
    }
}

fn parse_version(file_name: &str) -> Option<u64> {
    let digits = file_name
        .strip_prefix("snapshot_")?
        .strip_suffix(".rkyv")?;
    if digits.len() != 20 {
        return None;
    }
    digits.parse().ok()
}
