//! Document store rooted at a .doctree directory
//!
//! No database, no daemon - just files. The facade wires one shared index
//! into the per-concern stores and hands them out by accessor.

use crate::config::Config;
use crate::content::ContentStore;
use crate::impact::ImpactAnalyzer;
use crate::index::DocumentIndex;
use crate::reference::ReferenceTracker;
use crate::relation::RelationshipStore;
use crate::search::SearchEngine;
use crate::snapshot::SnapshotManager;
use crate::tree::TreeStore;
use crate::version::VersionStore;
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DOCTREE_DIR: &str = ".doctree";
const CONFIG_FILE: &str = "config.toml";
const DOCS_DIR: &str = "docs";
const HISTORY_DIR: &str = "history";

/// File-backed document store
pub struct DocumentStore {
    root: PathBuf,
    config: Config,
    index: Arc<DocumentIndex>,
}

impl DocumentStore {
    /// Find and open the store for the current directory
    pub fn open() -> Result<Self> {
        let root = Self::find_root()?;
        Self::open_at(&root)
    }

    /// Open the store rooted at `root` (directory containing .doctree)
    pub fn open_at(root: &Path) -> Result<Self> {
        let doctree_dir = root.join(DOCTREE_DIR);
        if !doctree_dir.exists() {
            return Err(Error::NotInitialized);
        }

        let config = Config::load(&doctree_dir.join(CONFIG_FILE))?;
        let index = Arc::new(DocumentIndex::open(&doctree_dir)?);
        tracing::debug!(root = %root.display(), "opened document store");

        Ok(Self {
            root: root.to_path_buf(),
            config,
            index,
        })
    }

    /// Initialize a new store in the current directory
    pub fn init(prefix: &str) -> Result<Self> {
        let root = std::env::current_dir()?;
        Self::init_at(&root, prefix)
    }

    /// Initialize a new store under `root`
    pub fn init_at(root: &Path, prefix: &str) -> Result<Self> {
        let doctree_dir = root.join(DOCTREE_DIR);
        if doctree_dir.exists() {
            return Err(Error::AlreadyInitialized(
                doctree_dir.display().to_string(),
            ));
        }

        fs::create_dir_all(doctree_dir.join(DOCS_DIR))?;
        fs::create_dir_all(doctree_dir.join(HISTORY_DIR))?;

        let mut config = Config::default();
        config.prefix = prefix.to_string();
        fs::write(doctree_dir.join(CONFIG_FILE), config.with_comments())?;

        // persist an empty index so a later open finds a valid file
        let index = Arc::new(DocumentIndex::open(&doctree_dir)?);
        index.mutate(|_| Ok(()))?;
        tracing::info!(root = %root.display(), prefix, "initialized document store");

        Ok(Self {
            root: root.to_path_buf(),
            config,
            index,
        })
    }

    /// Find the nearest ancestor directory containing .doctree
    fn find_root() -> Result<PathBuf> {
        let mut current = std::env::current_dir()?;
        loop {
            if current.join(DOCTREE_DIR).exists() {
                return Ok(current);
            }
            if !current.pop() {
                return Err(Error::NotInitialized);
            }
        }
    }

    /// Path to the .doctree directory
    pub fn doctree_dir(&self) -> PathBuf {
        self.root.join(DOCTREE_DIR)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn content_store(&self) -> ContentStore {
        ContentStore::new(&self.doctree_dir().join(DOCS_DIR))
    }

    fn snapshot_manager(&self) -> SnapshotManager {
        SnapshotManager::new(&self.doctree_dir().join(HISTORY_DIR))
    }

    pub fn tree(&self) -> TreeStore {
        TreeStore::new(self.index.clone(), self.content_store(), &self.config.prefix)
    }

    pub fn versions(&self) -> VersionStore {
        VersionStore::new(
            self.index.clone(),
            self.content_store(),
            self.snapshot_manager(),
        )
    }

    pub fn references(&self) -> ReferenceTracker {
        ReferenceTracker::new(self.index.clone())
    }

    pub fn relations(&self) -> RelationshipStore {
        RelationshipStore::new(self.index.clone())
    }

    pub fn impact(&self) -> ImpactAnalyzer {
        ImpactAnalyzer::new(self.index.clone())
    }

    pub fn search(&self) -> SearchEngine {
        SearchEngine::new(self.index.clone(), self.content_store())
    }

    #[cfg(test)]
    pub(crate) fn index(&self) -> &Arc<DocumentIndex> {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocumentType;

    #[test]
    fn test_init_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::init_at(dir.path(), "kb").unwrap();

        let doctree = store.doctree_dir();
        assert!(doctree.join("config.toml").exists());
        assert!(doctree.join("index.json").exists());
        assert!(doctree.join("docs").is_dir());
        assert!(doctree.join("history").is_dir());
        assert_eq!(store.config().prefix, "kb");
    }

    #[test]
    fn test_init_writes_commented_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::init_at(dir.path(), "wiki").unwrap();

        let raw = fs::read_to_string(store.doctree_dir().join("config.toml")).unwrap();
        assert!(raw.starts_with("# doctree configuration"));
        assert!(raw.contains("prefix = \"wiki\""));

        let reopened = DocumentStore::open_at(dir.path()).unwrap();
        assert_eq!(reopened.config().prefix, "wiki");
    }

    #[test]
    fn test_init_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        DocumentStore::init_at(dir.path(), "doc").unwrap();
        let err = DocumentStore::init_at(dir.path(), "doc");
        assert!(matches!(err, Err(Error::AlreadyInitialized(_))));
    }

    #[test]
    fn test_open_uninitialized_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = DocumentStore::open_at(dir.path());
        assert!(matches!(err, Err(Error::NotInitialized)));
    }

    #[test]
    fn test_reopen_sees_persisted_documents() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let store = DocumentStore::init_at(dir.path(), "doc").unwrap();
            store
                .tree()
                .create_node(None, "Architecture", DocumentType::Architecture, "# Arch")
                .unwrap()
                .id
        };

        let store = DocumentStore::open_at(dir.path()).unwrap();
        let (content, node) = store.tree().get_content(&id).unwrap();
        assert_eq!(node.title, "Architecture");
        assert_eq!(content, "# Arch");
    }
}
