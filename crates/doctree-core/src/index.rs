//! The document index: single authoritative in-memory state
//!
//! One reader/writer lock guards everything - document metadata, relationship
//! edges, and both reference indices. Mutations run entirely under the
//! exclusive lock and persist the whole index to index.json (temp+rename)
//! before returning. Queries hold the shared lock and hand out owned copies
//! only; the maps themselves never escape this module.

use crate::fsx::write_atomic;
use crate::model::{DocumentNode, Reference, Relationship, VIRTUAL_ROOT};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

const INDEX_FILE: &str = "index.json";

/// Everything the lock guards. BTreeMaps keep iteration order deterministic,
/// which traversal results and the on-disk format both rely on.
#[derive(Debug, Default)]
pub(crate) struct IndexState {
    pub(crate) docs: BTreeMap<String, DocumentNode>,
    /// Derived: parent id (or VIRTUAL_ROOT) -> position-sorted child ids
    pub(crate) children: BTreeMap<String, Vec<String>>,
    pub(crate) relationships: BTreeMap<String, Relationship>,
    /// Canonical references by id
    pub(crate) references: BTreeMap<String, Reference>,
    /// Derived: task id -> reference ids, insertion order
    pub(crate) refs_by_task: BTreeMap<String, Vec<String>>,
    /// Derived: document id -> reference ids, insertion order
    pub(crate) refs_by_doc: BTreeMap<String, Vec<String>>,
    pub(crate) version: u64,
}

/// On-disk shape of the index
#[derive(Serialize, Deserialize)]
struct IndexFile {
    documents: Vec<DocumentNode>,
    relationships: Vec<Relationship>,
    references_by_task: BTreeMap<String, Vec<Reference>>,
    references_by_document: BTreeMap<String, Vec<Reference>>,
    version: u64,
    updated_at: DateTime<Utc>,
}

/// Lock-guarded index with synchronous JSON persistence
pub struct DocumentIndex {
    path: PathBuf,
    state: RwLock<IndexState>,
}

impl DocumentIndex {
    /// Open the index stored in `dir`, loading index.json if it exists
    pub fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(INDEX_FILE);
        let state = if path.exists() {
            let data = std::fs::read(&path)?;
            let file: IndexFile = serde_json::from_slice(&data)?;
            IndexState::from_file(file)
        } else {
            IndexState::default()
        };
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    /// Run a query under the shared lock
    pub(crate) fn read<R>(&self, f: impl FnOnce(&IndexState) -> R) -> R {
        let state = self.state.read().expect("document index lock poisoned");
        f(&state)
    }

    /// Run a mutation under the exclusive lock, then persist the whole index.
    ///
    /// If `f` fails nothing is written; a non-success return means no
    /// guaranteed side effect occurred. If `f` succeeds but the persist
    /// fails, memory and disk may diverge and the error propagates.
    pub(crate) fn mutate<R>(&self, f: impl FnOnce(&mut IndexState) -> Result<R>) -> Result<R> {
        let mut state = self.state.write().expect("document index lock poisoned");
        let out = f(&mut state)?;
        state.version += 1;
        self.persist(&state)?;
        Ok(out)
    }

    fn persist(&self, state: &IndexState) -> Result<()> {
        let file = state.to_file();
        let data = serde_json::to_vec_pretty(&file)?;
        write_atomic(&self.path, &data)?;
        tracing::debug!(version = state.version, "persisted document index");
        Ok(())
    }
}

impl IndexState {
    fn from_file(file: IndexFile) -> Self {
        let mut state = IndexState {
            version: file.version,
            ..Default::default()
        };
        for node in file.documents {
            state.docs.insert(node.id.clone(), node);
        }
        for rel in file.relationships {
            state.relationships.insert(rel.id.clone(), rel);
        }
        // The document-keyed map is redundant with the task-keyed one;
        // rebuild both from the union so a hand-edited file stays coherent.
        for refs in file
            .references_by_task
            .into_values()
            .chain(file.references_by_document.into_values())
        {
            for r in refs {
                if !state.references.contains_key(&r.id) {
                    state.attach_reference(r);
                }
            }
        }
        state.rebuild_children();
        state
    }

    fn to_file(&self) -> IndexFile {
        let mut by_task: BTreeMap<String, Vec<Reference>> = BTreeMap::new();
        let mut by_doc: BTreeMap<String, Vec<Reference>> = BTreeMap::new();
        for (task, ids) in &self.refs_by_task {
            by_task.insert(task.clone(), self.refs_from_ids(ids));
        }
        for (doc, ids) in &self.refs_by_doc {
            by_doc.insert(doc.clone(), self.refs_from_ids(ids));
        }
        IndexFile {
            documents: self.docs.values().cloned().collect(),
            relationships: self.relationships.values().cloned().collect(),
            references_by_task: by_task,
            references_by_document: by_doc,
            version: self.version,
            updated_at: Utc::now(),
        }
    }

    fn refs_from_ids(&self, ids: &[String]) -> Vec<Reference> {
        ids.iter()
            .filter_map(|id| self.references.get(id))
            .cloned()
            .collect()
    }

    // --- documents ---

    pub(crate) fn node(&self, id: &str) -> Result<&DocumentNode> {
        self.docs
            .get(id)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Result<&mut DocumentNode> {
        self.docs
            .get_mut(id)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))
    }

    /// Key under which a node is filed in the children map
    pub(crate) fn parent_key(parent_id: Option<&str>) -> &str {
        parent_id.unwrap_or(VIRTUAL_ROOT)
    }

    pub(crate) fn children_of(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn insert_node(&mut self, node: DocumentNode) {
        let key = Self::parent_key(node.parent_id.as_deref()).to_string();
        self.children.entry(key.clone()).or_default().push(node.id.clone());
        self.docs.insert(node.id.clone(), node);
        self.sort_children(&key);
    }

    pub(crate) fn rebuild_children(&mut self) {
        self.children.clear();
        let filed: Vec<(String, String)> = self
            .docs
            .values()
            .map(|n| {
                (
                    Self::parent_key(n.parent_id.as_deref()).to_string(),
                    n.id.clone(),
                )
            })
            .collect();
        for (key, id) in filed {
            self.children.entry(key).or_default().push(id);
        }
        let keys: Vec<String> = self.children.keys().cloned().collect();
        for key in keys {
            self.sort_children(&key);
        }
    }

    fn sort_children(&mut self, parent: &str) {
        let docs = &self.docs;
        let emptied = match self.children.get_mut(parent) {
            None => return,
            Some(children) => {
                children.retain(|id| docs.contains_key(id));
                children.sort_by(|a, b| {
                    let pa = docs.get(a).map(|n| n.position).unwrap_or(u32::MAX);
                    let pb = docs.get(b).map(|n| n.position).unwrap_or(u32::MAX);
                    pa.cmp(&pb).then_with(|| a.cmp(b))
                });
                children.is_empty()
            }
        };
        if emptied {
            self.children.remove(parent);
        }
    }

    // --- references ---

    pub(crate) fn reference(&self, id: &str) -> Result<&Reference> {
        self.references
            .get(id)
            .ok_or_else(|| Error::ReferenceNotFound(id.to_string()))
    }

    pub(crate) fn reference_mut(&mut self, id: &str) -> Result<&mut Reference> {
        self.references
            .get_mut(id)
            .ok_or_else(|| Error::ReferenceNotFound(id.to_string()))
    }

    pub(crate) fn attach_reference(&mut self, r: Reference) {
        self.refs_by_task
            .entry(r.task_id.clone())
            .or_default()
            .push(r.id.clone());
        self.refs_by_doc
            .entry(r.document_id.clone())
            .or_default()
            .push(r.id.clone());
        self.references.insert(r.id.clone(), r);
    }

    pub(crate) fn detach_reference(&mut self, id: &str) -> Result<Reference> {
        let r = self
            .references
            .remove(id)
            .ok_or_else(|| Error::ReferenceNotFound(id.to_string()))?;
        if let Some(ids) = self.refs_by_task.get_mut(&r.task_id) {
            ids.retain(|x| x != id);
            if ids.is_empty() {
                self.refs_by_task.remove(&r.task_id);
            }
        }
        if let Some(ids) = self.refs_by_doc.get_mut(&r.document_id) {
            ids.retain(|x| x != id);
            if ids.is_empty() {
                self.refs_by_doc.remove(&r.document_id);
            }
        }
        Ok(r)
    }

    pub(crate) fn refs_for_task(&self, task_id: &str) -> Vec<Reference> {
        self.refs_by_task
            .get(task_id)
            .map(|ids| self.refs_from_ids(ids))
            .unwrap_or_default()
    }

    pub(crate) fn refs_for_doc(&self, doc_id: &str) -> Vec<Reference> {
        self.refs_by_doc
            .get(doc_id)
            .map(|ids| self.refs_from_ids(ids))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocumentType, ReferenceStatus};

    fn node(id: &str, parent: Option<&str>, level: u32, position: u32) -> DocumentNode {
        let now = Utc::now();
        DocumentNode {
            id: id.to_string(),
            parent_id: parent.map(String::from),
            title: id.to_string(),
            doc_type: DocumentType::Task,
            level,
            position,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn reference(id: &str, task: &str, doc: &str) -> Reference {
        let now = Utc::now();
        Reference {
            id: id.to_string(),
            task_id: task.to_string(),
            document_id: doc.to_string(),
            anchor: None,
            context: None,
            status: ReferenceStatus::Active,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_children_sorted_by_position() {
        let mut state = IndexState::default();
        state.insert_node(node("doc-a", None, 1, 0));
        state.insert_node(node("doc-c", Some("doc-a"), 2, 1));
        state.insert_node(node("doc-b", Some("doc-a"), 2, 0));
        assert_eq!(state.children_of("doc-a"), ["doc-b", "doc-c"]);
        assert_eq!(state.children_of(VIRTUAL_ROOT), ["doc-a"]);
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let index = DocumentIndex::open(dir.path()).unwrap();
        index
            .mutate(|state| {
                state.insert_node(node("doc-a", None, 1, 0));
                state.insert_node(node("doc-b", Some("doc-a"), 2, 0));
                state.attach_reference(reference("ref-1", "task-1", "doc-b"));
                Ok(())
            })
            .unwrap();

        let reloaded = DocumentIndex::open(dir.path()).unwrap();
        reloaded.read(|state| {
            assert_eq!(state.docs.len(), 2);
            assert_eq!(state.children_of("doc-a"), ["doc-b"]);
            assert_eq!(state.refs_for_task("task-1").len(), 1);
            assert_eq!(state.refs_for_doc("doc-b").len(), 1);
            assert_eq!(state.version, 1);
        });
    }

    #[test]
    fn test_failed_mutation_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let index = DocumentIndex::open(dir.path()).unwrap();
        let err = index.mutate(|state| -> Result<()> {
            state.insert_node(node("doc-a", None, 1, 0));
            Err(Error::Other("boom".into()))
        });
        assert!(err.is_err());
        assert!(!dir.path().join(INDEX_FILE).exists());
    }

    #[test]
    fn test_detach_reference_cleans_both_maps() {
        let mut state = IndexState::default();
        state.attach_reference(reference("ref-1", "task-1", "doc-a"));
        state.detach_reference("ref-1").unwrap();
        assert!(state.refs_by_task.is_empty());
        assert!(state.refs_by_doc.is_empty());
        assert!(matches!(
            state.detach_reference("ref-1"),
            Err(Error::ReferenceNotFound(_))
        ));
    }
}
