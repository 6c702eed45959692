//! Typed relationship edges between documents
//!
//! Relationships supplement the tree: ParentChild/Sibling edges mirror the
//! hierarchy, Reference edges express user-declared dependencies. Edges that
//! would close a cycle are rejected so dependency chains stay a DAG.

use crate::id::generate_id;
use crate::index::{DocumentIndex, IndexState};
use crate::model::{DependencyKind, RelationKind, Relationship};
use crate::{Error, Result};
use chrono::Utc;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct RelationshipStore {
    index: Arc<DocumentIndex>,
}

impl RelationshipStore {
    pub(crate) fn new(index: Arc<DocumentIndex>) -> Self {
        Self { index }
    }

    /// Create an edge from `from_id` to `to_id`. Both documents must exist;
    /// self-edges, duplicate (from, to, kind) edges, and edges closing a
    /// relationship cycle are rejected before any mutation.
    pub fn link(
        &self,
        from_id: &str,
        to_id: &str,
        kind: RelationKind,
        dependency_kind: Option<DependencyKind>,
        description: Option<&str>,
    ) -> Result<Relationship> {
        self.index.mutate(|state| {
            state.node(from_id)?;
            state.node(to_id)?;

            if from_id == to_id {
                return Err(Error::CycleDetected(from_id.to_string()));
            }
            if state
                .relationships
                .values()
                .any(|r| r.from_id == from_id && r.to_id == to_id && r.kind == kind)
            {
                return Err(Error::DuplicateRelation(format!(
                    "{} -{}-> {}",
                    from_id, kind, to_id
                )));
            }
            if closes_cycle(state, from_id, to_id) {
                return Err(Error::CycleDetected(format!(
                    "{} -> {} would close a relationship cycle",
                    from_id, to_id
                )));
            }

            let now = Utc::now();
            let rel = Relationship {
                id: generate_id("rel"),
                from_id: from_id.to_string(),
                to_id: to_id.to_string(),
                kind,
                dependency_kind,
                description: description
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(String::from),
                created_at: now,
                updated_at: now,
            };
            state.relationships.insert(rel.id.clone(), rel.clone());
            tracing::debug!(id = %rel.id, %kind, "linked documents");
            Ok(rel)
        })
    }

    pub fn unlink(&self, rel_id: &str) -> Result<()> {
        self.index.mutate(|state| {
            state
                .relationships
                .remove(rel_id)
                .ok_or_else(|| Error::RelationNotFound(rel_id.to_string()))?;
            Ok(())
        })
    }

    /// Edges touching `node_id` in either direction
    pub fn related(&self, node_id: &str) -> Vec<Relationship> {
        self.collect(|r| r.from_id == node_id || r.to_id == node_id)
    }

    pub fn outgoing(&self, node_id: &str) -> Vec<Relationship> {
        self.collect(|r| r.from_id == node_id)
    }

    pub fn incoming(&self, node_id: &str) -> Vec<Relationship> {
        self.collect(|r| r.to_id == node_id)
    }

    pub fn by_kind(&self, kind: RelationKind) -> Vec<Relationship> {
        self.collect(|r| r.kind == kind)
    }

    pub fn all(&self) -> Vec<Relationship> {
        self.collect(|_| true)
    }

    fn collect(&self, keep: impl Fn(&Relationship) -> bool) -> Vec<Relationship> {
        self.index.read(|state| {
            state
                .relationships
                .values()
                .filter(|r| keep(r))
                .cloned()
                .collect()
        })
    }
}

/// Would an edge from -> to create a path back to `from`? Checks for an
/// existing to -> from path over all relationship edges.
fn closes_cycle(state: &IndexState, from: &str, to: &str) -> bool {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
    for rel in state.relationships.values() {
        let f = *nodes
            .entry(rel.from_id.as_str())
            .or_insert_with(|| graph.add_node(rel.from_id.as_str()));
        let t = *nodes
            .entry(rel.to_id.as_str())
            .or_insert_with(|| graph.add_node(rel.to_id.as_str()));
        graph.add_edge(f, t, ());
    }
    match (nodes.get(to), nodes.get(from)) {
        (Some(&t), Some(&f)) => has_path_connecting(&graph, t, f, None),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocumentType;
    use crate::store::DocumentStore;

    fn store_with_docs(n: usize) -> (tempfile::TempDir, DocumentStore, Vec<String>) {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::init_at(dir.path(), "doc").unwrap();
        let ids = (0..n)
            .map(|i| {
                store
                    .tree()
                    .create_node(None, &format!("doc {}", i), DocumentType::Task, "")
                    .unwrap()
                    .id
            })
            .collect();
        (dir, store, ids)
    }

    #[test]
    fn test_link_and_queries() {
        let (_dir, store, ids) = store_with_docs(3);
        let rels = store.relations();
        rels.link(&ids[0], &ids[1], RelationKind::Reference, Some(DependencyKind::Data), None)
            .unwrap();
        rels.link(&ids[2], &ids[1], RelationKind::Reference, None, Some("uses api"))
            .unwrap();

        assert_eq!(rels.outgoing(&ids[0]).len(), 1);
        assert_eq!(rels.incoming(&ids[1]).len(), 2);
        assert_eq!(rels.related(&ids[1]).len(), 2);
        assert_eq!(rels.by_kind(RelationKind::Reference).len(), 2);
    }

    #[test]
    fn test_link_validates_endpoints_and_duplicates() {
        let (_dir, store, ids) = store_with_docs(2);
        let rels = store.relations();

        assert!(matches!(
            rels.link("doc-nope", &ids[0], RelationKind::Reference, None, None),
            Err(Error::NodeNotFound(_))
        ));
        assert!(matches!(
            rels.link(&ids[0], &ids[0], RelationKind::Reference, None, None),
            Err(Error::CycleDetected(_))
        ));

        rels.link(&ids[0], &ids[1], RelationKind::Reference, None, None)
            .unwrap();
        assert!(matches!(
            rels.link(&ids[0], &ids[1], RelationKind::Reference, None, None),
            Err(Error::DuplicateRelation(_))
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let (_dir, store, ids) = store_with_docs(3);
        let rels = store.relations();
        rels.link(&ids[0], &ids[1], RelationKind::Reference, None, None)
            .unwrap();
        rels.link(&ids[1], &ids[2], RelationKind::Reference, None, None)
            .unwrap();

        let err = rels.link(&ids[2], &ids[0], RelationKind::Reference, None, None);
        assert!(matches!(err, Err(Error::CycleDetected(_))));
    }

    #[test]
    fn test_unlink() {
        let (_dir, store, ids) = store_with_docs(2);
        let rels = store.relations();
        let rel = rels
            .link(&ids[0], &ids[1], RelationKind::Sibling, None, None)
            .unwrap();
        rels.unlink(&rel.id).unwrap();
        assert!(rels.all().is_empty());
        assert!(matches!(
            rels.unlink(&rel.id),
            Err(Error::RelationNotFound(_))
        ));
    }
}
