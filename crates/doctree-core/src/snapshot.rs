//! Content snapshots: immutable copies of superseded document versions
//!
//! Layout per node: history/{node_id}/{version}.md plus a snapshots.json
//! index sorted version-descending. The live version is not a snapshot.

use crate::fsx::{remove_if_exists, write_atomic};
use crate::model::SnapshotMeta;
use crate::{Error, Result};
use chrono::Utc;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const SNAPSHOT_INDEX: &str = "snapshots.json";

#[derive(Debug, Clone)]
pub struct SnapshotManager {
    history_dir: PathBuf,
}

impl SnapshotManager {
    pub(crate) fn new(history_dir: &Path) -> Self {
        Self {
            history_dir: history_dir.to_path_buf(),
        }
    }

    fn node_dir(&self, node_id: &str) -> PathBuf {
        self.history_dir.join(node_id)
    }

    fn snapshot_path(&self, node_id: &str, version: u64) -> PathBuf {
        self.node_dir(node_id).join(format!("{}.md", version))
    }

    /// Store `content` as the snapshot of `node_id` at `version`
    pub fn create_snapshot(&self, node_id: &str, version: u64, content: &str) -> Result<()> {
        let dir = self.node_dir(node_id);
        fs::create_dir_all(&dir)?;

        let path = self.snapshot_path(node_id, version);
        write_atomic(&path, content.as_bytes())?;

        let mut snapshots = self.load_index(node_id)?;
        let meta = SnapshotMeta {
            version,
            created_at: Utc::now(),
            size: content.len() as u64,
            path,
        };
        // Re-snapshotting the same version replaces the entry
        match snapshots.iter_mut().find(|s| s.version == version) {
            Some(existing) => *existing = meta,
            None => snapshots.push(meta),
        }
        snapshots.sort_by(|a, b| b.version.cmp(&a.version));
        self.save_index(node_id, &snapshots)
    }

    /// Snapshot history, newest first; `limit` of 0 means unlimited
    pub fn list_snapshots(&self, node_id: &str, limit: usize) -> Result<Vec<SnapshotMeta>> {
        let mut snapshots = self.load_index(node_id)?;
        if limit > 0 && snapshots.len() > limit {
            snapshots.truncate(limit);
        }
        Ok(snapshots)
    }

    /// Read the stored content of a specific version
    pub fn get_snapshot(&self, node_id: &str, version: u64) -> Result<String> {
        match fs::read_to_string(self.snapshot_path(node_id, version)) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::SnapshotNotFound {
                node: node_id.to_string(),
                version,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Retention: delete snapshots beyond the newest `keep`, returning the
    /// number removed. Tolerates files already gone. Never called implicitly.
    pub fn cleanup_snapshots(&self, node_id: &str, keep: usize) -> Result<usize> {
        let mut snapshots = self.load_index(node_id)?;
        if snapshots.len() <= keep {
            return Ok(0);
        }

        let stale = snapshots.split_off(keep);
        for snap in &stale {
            remove_if_exists(&snap.path)?;
        }
        self.save_index(node_id, &snapshots)?;
        tracing::debug!(node = node_id, removed = stale.len(), "pruned snapshots");
        Ok(stale.len())
    }

    fn load_index(&self, node_id: &str) -> Result<Vec<SnapshotMeta>> {
        let path = self.node_dir(node_id).join(SNAPSHOT_INDEX);
        match fs::read(&path) {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save_index(&self, node_id: &str, snapshots: &[SnapshotMeta]) -> Result<()> {
        let path = self.node_dir(node_id).join(SNAPSHOT_INDEX);
        let data = serde_json::to_vec_pretty(snapshots)?;
        write_atomic(&path, &data)?;
        Ok(())
    }
}
