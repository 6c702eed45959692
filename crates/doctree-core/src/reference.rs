//! Task-document reference lifecycle
//!
//! References link external task ids (opaque foreign keys) to documents and
//! carry a staleness status. They are indexed by task and by document for
//! O(1) bidirectional lookup; every query hands out independent copies.

use crate::id::generate_id;
use crate::index::DocumentIndex;
use crate::model::{Reference, ReferenceStatus};
use crate::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

const MAX_ANCHOR_CHARS: usize = 120;

/// Counts per status plus how many tasks/documents hold references
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReferenceStats {
    pub total: usize,
    pub active: usize,
    pub outdated: usize,
    pub broken: usize,
    pub tasks: usize,
    pub documents: usize,
}

#[derive(Clone)]
pub struct ReferenceTracker {
    index: Arc<DocumentIndex>,
}

impl ReferenceTracker {
    pub(crate) fn new(index: Arc<DocumentIndex>) -> Self {
        Self { index }
    }

    /// Create an Active reference from `task_id` to `document_id`.
    ///
    /// The document must exist; the anchor, when given, is trimmed and must
    /// stay within 120 code points with no CR/LF/TAB.
    pub fn create_reference(
        &self,
        task_id: &str,
        document_id: &str,
        anchor: Option<&str>,
        context: Option<&str>,
    ) -> Result<Reference> {
        let anchor = validate_anchor(anchor)?;
        let context = context
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);

        self.index.mutate(|state| {
            state.node(document_id)?;

            let now = Utc::now();
            let reference = Reference {
                id: generate_id("ref"),
                task_id: task_id.to_string(),
                document_id: document_id.to_string(),
                anchor: anchor.clone(),
                context: context.clone(),
                status: ReferenceStatus::Active,
                version: 1,
                created_at: now,
                updated_at: now,
            };
            state.attach_reference(reference.clone());
            tracing::debug!(id = %reference.id, task = task_id, doc = document_id, "created reference");
            Ok(reference)
        })
    }

    /// Unconditional status overwrite; no transition graph is enforced
    pub fn update_status(&self, ref_id: &str, status: ReferenceStatus) -> Result<Reference> {
        self.index.mutate(|state| {
            let r = state.reference_mut(ref_id)?;
            r.status = status;
            r.updated_at = Utc::now();
            Ok(r.clone())
        })
    }

    /// Transition every Active reference of `document_id` to Outdated.
    ///
    /// Idempotent: already non-Active references are untouched. Returns the
    /// number transitioned. Callers must invoke this right after a
    /// successful content update on the same document.
    pub fn mark_document_outdated(&self, document_id: &str) -> Result<usize> {
        self.index.mutate(|state| {
            let ids: Vec<String> = state
                .refs_for_doc(document_id)
                .iter()
                .filter(|r| r.status == ReferenceStatus::Active)
                .map(|r| r.id.clone())
                .collect();
            let now = Utc::now();
            for id in &ids {
                let r = state.reference_mut(id)?;
                r.status = ReferenceStatus::Outdated;
                r.updated_at = now;
            }
            if !ids.is_empty() {
                tracing::debug!(doc = document_id, count = ids.len(), "marked references outdated");
            }
            Ok(ids.len())
        })
    }

    /// Remove a reference from both indices
    pub fn delete_reference(&self, ref_id: &str) -> Result<()> {
        self.index.mutate(|state| {
            state.detach_reference(ref_id)?;
            Ok(())
        })
    }

    pub fn find_reference(&self, ref_id: &str) -> Result<Reference> {
        self.index.read(|state| state.reference(ref_id).cloned())
    }

    pub fn references_by_task(&self, task_id: &str) -> Vec<Reference> {
        self.index.read(|state| state.refs_for_task(task_id))
    }

    pub fn references_by_document(&self, document_id: &str) -> Vec<Reference> {
        self.index.read(|state| state.refs_for_doc(document_id))
    }

    pub fn active_references(&self) -> Vec<Reference> {
        self.by_status(ReferenceStatus::Active)
    }

    pub fn outdated_references(&self) -> Vec<Reference> {
        self.by_status(ReferenceStatus::Outdated)
    }

    fn by_status(&self, status: ReferenceStatus) -> Vec<Reference> {
        self.index.read(|state| {
            state
                .references
                .values()
                .filter(|r| r.status == status)
                .cloned()
                .collect()
        })
    }

    pub fn stats(&self) -> ReferenceStats {
        self.index.read(|state| {
            let mut stats = ReferenceStats {
                total: state.references.len(),
                tasks: state.refs_by_task.len(),
                documents: state.refs_by_doc.len(),
                ..Default::default()
            };
            for r in state.references.values() {
                match r.status {
                    ReferenceStatus::Active => stats.active += 1,
                    ReferenceStatus::Outdated => stats.outdated += 1,
                    ReferenceStatus::Broken => stats.broken += 1,
                }
            }
            stats
        })
    }
}

/// Trim and validate an anchor; blank anchors collapse to None
fn validate_anchor(anchor: Option<&str>) -> Result<Option<String>> {
    let Some(anchor) = anchor.map(str::trim).filter(|a| !a.is_empty()) else {
        return Ok(None);
    };
    if anchor.contains(['\r', '\n', '\t']) {
        return Err(Error::InvalidAnchor(
            "anchor contains control whitespace".to_string(),
        ));
    }
    if anchor.chars().count() > MAX_ANCHOR_CHARS {
        return Err(Error::InvalidAnchor(format!(
            "anchor exceeds {} characters",
            MAX_ANCHOR_CHARS
        )));
    }
    Ok(Some(anchor.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocumentType;
    use crate::store::DocumentStore;

    fn store_with_doc() -> (tempfile::TempDir, DocumentStore, String) {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::init_at(dir.path(), "doc").unwrap();
        let node = store
            .tree()
            .create_node(None, "Doc", DocumentType::Requirements, "body")
            .unwrap();
        (dir, store, node.id)
    }

    #[test]
    fn test_create_reference_indexed_both_ways() {
        let (_dir, store, doc) = store_with_doc();
        let refs = store.references();
        let r = refs
            .create_reference("task-1", &doc, Some("## section"), Some("why"))
            .unwrap();
        assert_eq!(r.status, ReferenceStatus::Active);
        assert_eq!(r.version, 1);

        assert_eq!(refs.references_by_task("task-1").len(), 1);
        assert_eq!(refs.references_by_document(&doc).len(), 1);
        assert_eq!(refs.find_reference(&r.id).unwrap().anchor.as_deref(), Some("## section"));
    }

    #[test]
    fn test_reference_requires_existing_document() {
        let (_dir, store, _) = store_with_doc();
        let err = store
            .references()
            .create_reference("task-1", "doc-nope", None, None);
        assert!(matches!(err, Err(Error::NodeNotFound(_))));
    }

    #[test]
    fn test_anchor_validation() {
        let (_dir, store, doc) = store_with_doc();
        let refs = store.references();

        let err = refs.create_reference("t", &doc, Some("bad\tanchor"), None);
        assert!(matches!(err, Err(Error::InvalidAnchor(_))));

        let long = "x".repeat(121);
        let err = refs.create_reference("t", &doc, Some(&long), None);
        assert!(matches!(err, Err(Error::InvalidAnchor(_))));

        // exactly at the limit is fine; blank collapses to None
        let max = "y".repeat(120);
        assert!(refs.create_reference("t", &doc, Some(&max), None).is_ok());
        let r = refs.create_reference("t", &doc, Some("   "), None).unwrap();
        assert!(r.anchor.is_none());
    }

    #[test]
    fn test_mark_outdated_is_idempotent() {
        let (_dir, store, doc) = store_with_doc();
        let refs = store.references();
        let r1 = refs.create_reference("t1", &doc, None, None).unwrap();
        let r2 = refs.create_reference("t2", &doc, None, None).unwrap();
        refs.update_status(&r2.id, ReferenceStatus::Broken).unwrap();

        assert_eq!(refs.mark_document_outdated(&doc).unwrap(), 1);
        assert_eq!(
            refs.find_reference(&r1.id).unwrap().status,
            ReferenceStatus::Outdated
        );
        // broken stays broken, second pass changes nothing
        assert_eq!(
            refs.find_reference(&r2.id).unwrap().status,
            ReferenceStatus::Broken
        );
        assert_eq!(refs.mark_document_outdated(&doc).unwrap(), 0);
        assert_eq!(
            refs.find_reference(&r1.id).unwrap().status,
            ReferenceStatus::Outdated
        );
    }

    #[test]
    fn test_delete_reference_clears_both_indices() {
        let (_dir, store, doc) = store_with_doc();
        let refs = store.references();
        let r = refs.create_reference("t1", &doc, None, None).unwrap();

        refs.delete_reference(&r.id).unwrap();
        assert!(refs.references_by_task("t1").is_empty());
        assert!(refs.references_by_document(&doc).is_empty());
        assert!(matches!(
            refs.delete_reference(&r.id),
            Err(Error::ReferenceNotFound(_))
        ));
    }

    #[test]
    fn test_queries_return_independent_copies() {
        let (_dir, store, doc) = store_with_doc();
        let refs = store.references();
        refs.create_reference("t1", &doc, None, None).unwrap();

        let mut copy = refs.references_by_task("t1");
        copy[0].status = ReferenceStatus::Broken;
        copy.clear();
        assert_eq!(
            refs.references_by_task("t1")[0].status,
            ReferenceStatus::Active
        );
    }

    #[test]
    fn test_stats_counts_by_status() {
        let (_dir, store, doc) = store_with_doc();
        let refs = store.references();
        refs.create_reference("t1", &doc, None, None).unwrap();
        let r = refs.create_reference("t2", &doc, None, None).unwrap();
        refs.update_status(&r.id, ReferenceStatus::Broken).unwrap();

        let stats = refs.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.broken, 1);
        assert_eq!(stats.tasks, 2);
        assert_eq!(stats.documents, 1);
    }
}
