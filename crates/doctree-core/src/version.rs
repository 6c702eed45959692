//! Versioned content mutation with compare-and-swap semantics
//!
//! update_content holds the exclusive index lock for the whole sequence:
//! snapshot the superseded version, write the new content, bump the version,
//! persist the index. Exactly one of N racing callers with the same expected
//! version wins; the rest observe VersionMismatch and mutate nothing.

use crate::content::ContentStore;
use crate::diff::{diff_content, DiffResult};
use crate::index::DocumentIndex;
use crate::model::SnapshotMeta;
use crate::snapshot::SnapshotManager;
use crate::{Error, Result};
use chrono::Utc;
use std::fs;
use std::sync::Arc;

/// Version used by compare_versions to mean "the live content"
pub const LIVE_VERSION: u64 = 0;

#[derive(Clone)]
pub struct VersionStore {
    index: Arc<DocumentIndex>,
    content: ContentStore,
    snapshots: SnapshotManager,
}

impl VersionStore {
    pub(crate) fn new(
        index: Arc<DocumentIndex>,
        content: ContentStore,
        snapshots: SnapshotManager,
    ) -> Self {
        Self {
            index,
            content,
            snapshots,
        }
    }

    /// CAS update: succeeds only when `expected_version` matches the stored
    /// version. Returns the new version number.
    ///
    /// Marking the document's references outdated afterwards is the caller's
    /// responsibility; the two subsystems are not transactionally linked.
    pub fn update_content(
        &self,
        node_id: &str,
        new_content: &str,
        expected_version: u64,
    ) -> Result<u64> {
        self.index.mutate(|state| {
            let current = state.node(node_id)?.version;
            if current != expected_version {
                return Err(Error::VersionMismatch {
                    node: node_id.to_string(),
                    expected: expected_version,
                    actual: current,
                });
            }

            let previous = self.content.read_or_empty(node_id)?;
            self.snapshots.create_snapshot(node_id, current, &previous)?;
            self.content.write(node_id, new_content)?;

            let node = state.node_mut(node_id)?;
            node.version = current + 1;
            node.updated_at = Utc::now();
            tracing::debug!(id = node_id, version = node.version, "updated content");
            Ok(node.version)
        })
    }

    /// Version history, newest first: stored snapshots merged with a
    /// synthesized entry for the live version. `limit` of 0 means unlimited.
    pub fn get_version_history(&self, node_id: &str, limit: usize) -> Result<Vec<SnapshotMeta>> {
        let node = self.index.read(|state| state.node(node_id).cloned())?;
        let mut history = self.snapshots.list_snapshots(node_id, 0)?;

        if !history.iter().any(|s| s.version == node.version) {
            let path = self.content.path(node_id);
            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            history.push(SnapshotMeta {
                version: node.version,
                created_at: node.updated_at,
                path,
                size,
            });
        }

        history.sort_by(|a, b| b.version.cmp(&a.version));
        if limit > 0 && history.len() > limit {
            history.truncate(limit);
        }
        Ok(history)
    }

    /// Content at a specific version: the live file when `version` is
    /// current, otherwise the snapshot store.
    pub fn get_version_content(&self, node_id: &str, version: u64) -> Result<String> {
        let node = self.index.read(|state| state.node(node_id).cloned())?;
        if node.version == version {
            self.content.read_or_empty(node_id)
        } else {
            self.snapshots.get_snapshot(node_id, version)
        }
    }

    /// Line diff between two versions; LIVE_VERSION (0) denotes the live one
    pub fn compare_versions(&self, node_id: &str, from: u64, to: u64) -> Result<DiffResult> {
        let resolve = |version: u64| -> Result<String> {
            if version == LIVE_VERSION {
                self.content.read_or_empty(node_id)
            } else {
                self.get_version_content(node_id, version)
            }
        };
        let old = resolve(from)?;
        let new = resolve(to)?;
        Ok(diff_content(&old, &new, from, to))
    }

    /// Retention policy entry point; never called implicitly by updates
    pub fn cleanup_snapshots(&self, node_id: &str, keep: usize) -> Result<usize> {
        self.index.read(|state| state.node(node_id).map(|_| ()))?;
        self.snapshots.cleanup_snapshots(node_id, keep)
    }
}
