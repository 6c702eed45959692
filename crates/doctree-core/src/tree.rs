//! Hierarchy operations: node creation, tree retrieval, moves, metadata edits

use crate::content::ContentStore;
use crate::id::generate_id;
use crate::index::{DocumentIndex, IndexState};
use crate::model::{DocumentNode, DocumentType, TreeNode, MAX_CHILDREN_PER_NODE, MAX_LEVEL};
use crate::{Error, Result};
use chrono::Utc;
use std::sync::Arc;

#[derive(Clone)]
pub struct TreeStore {
    index: Arc<DocumentIndex>,
    content: ContentStore,
    prefix: String,
}

impl TreeStore {
    pub(crate) fn new(index: Arc<DocumentIndex>, content: ContentStore, prefix: &str) -> Self {
        Self {
            index,
            content,
            prefix: prefix.to_string(),
        }
    }

    /// Create a document under `parent_id` (or as a new root).
    ///
    /// All validation happens before anything is written; on failure the
    /// index and the content namespace are untouched.
    pub fn create_node(
        &self,
        parent_id: Option<&str>,
        title: &str,
        doc_type: DocumentType,
        content: &str,
    ) -> Result<DocumentNode> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidTitle("title cannot be empty".to_string()));
        }

        self.index.mutate(|state| {
            let level = match parent_id {
                Some(pid) => {
                    let parent = state.node(pid)?;
                    parent.level + 1
                }
                None => 1,
            };
            if level > MAX_LEVEL {
                return Err(Error::HierarchyOverflow(level));
            }

            let key = IndexState::parent_key(parent_id);
            let siblings = state.children_of(key);
            if parent_id.is_some() && siblings.len() >= MAX_CHILDREN_PER_NODE {
                return Err(Error::ChildrenLimitReached(key.to_string()));
            }

            let now = Utc::now();
            let node = DocumentNode {
                id: generate_id(&self.prefix),
                parent_id: parent_id.map(String::from),
                title: title.to_string(),
                doc_type,
                level,
                position: siblings.len() as u32,
                version: 1,
                created_at: now,
                updated_at: now,
            };

            self.content.write(&node.id, content)?;
            state.insert_node(node.clone());
            tracing::debug!(id = %node.id, level, "created document node");
            Ok(node)
        })
    }

    /// Expand the tree below `root_id` (or a synthetic virtual root covering
    /// every root document) down to `depth` levels; 0 expands without bound.
    /// Children below the depth boundary are omitted, not an error.
    pub fn get_tree(&self, root_id: Option<&str>, depth: u32) -> Result<TreeNode> {
        let depth = if depth == 0 { u32::MAX } else { depth };
        self.index.read(|state| {
            let root = match root_id {
                Some(id) => state.node(id)?.clone(),
                None => DocumentNode::virtual_root(),
            };
            Ok(build_tree(state, root, depth))
        })
    }

    /// Re-parent a node, revalidating depth and fan-out for the whole subtree
    /// before any mutation takes place.
    pub fn move_node(
        &self,
        node_id: &str,
        new_parent_id: Option<&str>,
        position: u32,
    ) -> Result<()> {
        self.index.mutate(|state| {
            state.node(node_id)?;

            let new_level = match new_parent_id {
                Some(pid) => {
                    if pid == node_id || is_descendant(state, node_id, pid) {
                        return Err(Error::CycleDetected(format!(
                            "{} cannot be moved under its own subtree",
                            node_id
                        )));
                    }
                    let parent = state.node(pid)?;
                    let siblings = state.children_of(pid);
                    let already_there = siblings.iter().any(|c| c == node_id);
                    if !already_there && siblings.len() >= MAX_CHILDREN_PER_NODE {
                        return Err(Error::ChildrenLimitReached(pid.to_string()));
                    }
                    parent.level + 1
                }
                None => 1,
            };

            let deepest = new_level + subtree_height(state, node_id);
            if deepest > MAX_LEVEL {
                return Err(Error::HierarchyOverflow(deepest));
            }

            let now = Utc::now();
            {
                let node = state.node_mut(node_id)?;
                node.parent_id = new_parent_id.map(String::from);
                node.level = new_level;
                node.position = position;
                node.updated_at = now;
            }
            relevel_children(state, node_id, new_level);
            state.rebuild_children();
            Ok(())
        })
    }

    /// Metadata-only edit of title and/or type
    pub fn update_node(
        &self,
        node_id: &str,
        title: Option<&str>,
        doc_type: Option<DocumentType>,
    ) -> Result<DocumentNode> {
        if title.is_none() && doc_type.is_none() {
            return Err(Error::Other("no fields to update".to_string()));
        }
        if let Some(t) = title {
            if t.trim().is_empty() {
                return Err(Error::InvalidTitle("title cannot be empty".to_string()));
            }
        }

        self.index.mutate(|state| {
            let node = state.node_mut(node_id)?;
            if let Some(t) = title {
                node.title = t.trim().to_string();
            }
            if let Some(dt) = doc_type {
                node.doc_type = dt;
            }
            node.updated_at = Utc::now();
            Ok(node.clone())
        })
    }

    /// Live content plus metadata; a node whose content file is missing
    /// reads as empty.
    pub fn get_content(&self, node_id: &str) -> Result<(String, DocumentNode)> {
        let node = self.index.read(|state| state.node(node_id).cloned())?;
        let content = self.content.read_or_empty(node_id)?;
        Ok((content, node))
    }

    /// Number of documents in the store
    pub fn len(&self) -> usize {
        self.index.read(|state| state.docs.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn build_tree(state: &IndexState, node: DocumentNode, depth: u32) -> TreeNode {
    let id = node.id.clone();
    let mut tree = TreeNode {
        node,
        children: Vec::new(),
    };
    if depth == 0 {
        return tree;
    }
    for child_id in state.children_of(&id) {
        if let Ok(child) = state.node(child_id) {
            tree.children.push(build_tree(state, child.clone(), depth - 1));
        }
    }
    tree
}

/// Is `target` somewhere below `node_id`?
fn is_descendant(state: &IndexState, node_id: &str, target: &str) -> bool {
    state.children_of(node_id).iter().any(|child| {
        child == target || is_descendant(state, child, target)
    })
}

/// Levels below `node_id` (0 for a leaf)
fn subtree_height(state: &IndexState, node_id: &str) -> u32 {
    state
        .children_of(node_id)
        .iter()
        .map(|child| 1 + subtree_height(state, child))
        .max()
        .unwrap_or(0)
}

fn relevel_children(state: &mut IndexState, node_id: &str, parent_level: u32) {
    let children: Vec<String> = state.children_of(node_id).to_vec();
    let now = Utc::now();
    for child_id in children {
        if let Ok(child) = state.node_mut(&child_id) {
            child.level = parent_level + 1;
            child.updated_at = now;
        }
        relevel_children(state, &child_id, parent_level + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VIRTUAL_ROOT;
    use crate::store::DocumentStore;

    fn store() -> (tempfile::TempDir, DocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::init_at(dir.path(), "doc").unwrap();
        (dir, store)
    }

    #[test]
    fn test_levels_follow_parents() {
        let (_dir, store) = store();
        let tree = store.tree();
        let a = tree
            .create_node(None, "Root A", DocumentType::Architecture, "a")
            .unwrap();
        assert_eq!(a.level, 1);
        assert!(a.is_root());

        let b = tree
            .create_node(Some(&a.id), "Child B", DocumentType::Task, "b")
            .unwrap();
        assert_eq!(b.level, 2);
        assert_eq!(b.parent_id.as_deref(), Some(a.id.as_str()));
        assert_eq!(b.version, 1);
    }

    #[test]
    fn test_hierarchy_overflow_leaves_index_unchanged() {
        let (_dir, store) = store();
        let tree = store.tree();
        let mut parent = tree
            .create_node(None, "L1", DocumentType::Task, "")
            .unwrap();
        for level in 2..=MAX_LEVEL {
            parent = tree
                .create_node(Some(&parent.id), &format!("L{}", level), DocumentType::Task, "")
                .unwrap();
        }

        let before = tree.len();
        let err = tree.create_node(Some(&parent.id), "too deep", DocumentType::Task, "");
        assert!(matches!(err, Err(Error::HierarchyOverflow(_))));
        assert_eq!(tree.len(), before);
        // no orphan entry survives a reload either
        let reopened = DocumentStore::open_at(_dir.path()).unwrap();
        assert_eq!(reopened.tree().len(), before);
    }

    #[test]
    fn test_missing_parent_rejected() {
        let (_dir, store) = store();
        let err = store
            .tree()
            .create_node(Some("doc-nope"), "x", DocumentType::Task, "");
        assert!(matches!(err, Err(Error::NodeNotFound(_))));
    }

    #[test]
    fn test_virtual_root_wraps_all_roots() {
        let (_dir, store) = store();
        let tree = store.tree();
        let a = tree.create_node(None, "A", DocumentType::Task, "").unwrap();
        let b = tree.create_node(None, "B", DocumentType::Task, "").unwrap();
        tree.create_node(Some(&a.id), "A1", DocumentType::Task, "")
            .unwrap();

        let full = tree.get_tree(None, 10).unwrap();
        assert_eq!(full.node.id, VIRTUAL_ROOT);
        assert_eq!(full.children.len(), 2);
        let ids: Vec<&str> = full.children.iter().map(|c| c.node.id.as_str()).collect();
        assert!(ids.contains(&a.id.as_str()));
        assert!(ids.contains(&b.id.as_str()));
    }

    #[test]
    fn test_depth_zero_expands_unbounded() {
        let (_dir, store) = store();
        let tree = store.tree();
        let a = tree.create_node(None, "A", DocumentType::Task, "").unwrap();
        let b = tree
            .create_node(Some(&a.id), "B", DocumentType::Task, "")
            .unwrap();
        let c = tree
            .create_node(Some(&b.id), "C", DocumentType::Task, "")
            .unwrap();

        // the whole forest, down to the deepest leaf
        let full = tree.get_tree(None, 0).unwrap();
        assert!(!full.children.is_empty());
        let leaf = &full.children[0].children[0].children[0];
        assert_eq!(leaf.node.id, c.id);

        let rooted = tree.get_tree(Some(&a.id), 0).unwrap();
        assert_eq!(rooted.children[0].node.id, b.id);
        assert_eq!(rooted.children[0].children[0].node.id, c.id);
    }

    #[test]
    fn test_depth_boundary_truncates_silently() {
        let (_dir, store) = store();
        let tree = store.tree();
        let a = tree.create_node(None, "A", DocumentType::Task, "").unwrap();
        let b = tree
            .create_node(Some(&a.id), "B", DocumentType::Task, "")
            .unwrap();
        tree.create_node(Some(&b.id), "C", DocumentType::Task, "")
            .unwrap();

        let shallow = tree.get_tree(Some(&a.id), 1).unwrap();
        assert_eq!(shallow.children.len(), 1);
        assert!(shallow.children[0].children.is_empty());
    }

    #[test]
    fn test_move_node_relevels_subtree() {
        let (_dir, store) = store();
        let tree = store.tree();
        let a = tree.create_node(None, "A", DocumentType::Task, "").unwrap();
        let b = tree.create_node(None, "B", DocumentType::Task, "").unwrap();
        let b1 = tree
            .create_node(Some(&b.id), "B1", DocumentType::Task, "")
            .unwrap();

        tree.move_node(&b.id, Some(&a.id), 0).unwrap();
        let (_, moved) = tree.get_content(&b.id).unwrap();
        assert_eq!(moved.level, 2);
        let (_, child) = tree.get_content(&b1.id).unwrap();
        assert_eq!(child.level, 3);
    }

    #[test]
    fn test_move_under_own_descendant_rejected() {
        let (_dir, store) = store();
        let tree = store.tree();
        let a = tree.create_node(None, "A", DocumentType::Task, "").unwrap();
        let a1 = tree
            .create_node(Some(&a.id), "A1", DocumentType::Task, "")
            .unwrap();

        let err = tree.move_node(&a.id, Some(&a1.id), 0);
        assert!(matches!(err, Err(Error::CycleDetected(_))));
        let err = tree.move_node(&a.id, Some(&a.id), 0);
        assert!(matches!(err, Err(Error::CycleDetected(_))));
    }

    #[test]
    fn test_move_overflow_checked_against_subtree() {
        let (_dir, store) = store();
        let tree = store.tree();
        // chain of depth MAX_LEVEL rooted at `top`
        let top = tree.create_node(None, "top", DocumentType::Task, "").unwrap();
        let mut tail = top.clone();
        for _ in 2..=MAX_LEVEL {
            tail = tree
                .create_node(Some(&tail.id), "n", DocumentType::Task, "")
                .unwrap();
        }
        let other = tree.create_node(None, "other", DocumentType::Task, "").unwrap();

        // moving the chain under `other` would push the tail past MAX_LEVEL
        let err = tree.move_node(&top.id, Some(&other.id), 0);
        assert!(matches!(err, Err(Error::HierarchyOverflow(_))));
        let (_, unchanged) = tree.get_content(&top.id).unwrap();
        assert_eq!(unchanged.level, 1);
    }

    #[test]
    fn test_update_node_metadata() {
        let (_dir, store) = store();
        let tree = store.tree();
        let a = tree.create_node(None, "A", DocumentType::Task, "").unwrap();

        let updated = tree
            .update_node(&a.id, Some("  Renamed  "), Some(DocumentType::Meeting))
            .unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.doc_type, DocumentType::Meeting);
        assert!(tree.update_node(&a.id, Some("   "), None).is_err());
        assert!(tree.update_node(&a.id, None, None).is_err());
    }

    #[test]
    fn test_content_written_on_create() {
        let (_dir, store) = store();
        let a = store
            .tree()
            .create_node(None, "A", DocumentType::Task, "hello world")
            .unwrap();
        let (content, node) = store.tree().get_content(&a.id).unwrap();
        assert_eq!(content, "hello world");
        assert_eq!(node.version, 1);
    }
}
