//! Live content files, one markdown file per document id

use crate::fsx::write_atomic;
use crate::Result;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Stores current document bodies under docs/{id}.md
#[derive(Debug, Clone)]
pub(crate) struct ContentStore {
    docs_dir: PathBuf,
}

impl ContentStore {
    pub(crate) fn new(docs_dir: &Path) -> Self {
        Self {
            docs_dir: docs_dir.to_path_buf(),
        }
    }

    pub(crate) fn path(&self, node_id: &str) -> PathBuf {
        self.docs_dir.join(format!("{}.md", node_id))
    }

    pub(crate) fn write(&self, node_id: &str, content: &str) -> Result<()> {
        fs::create_dir_all(&self.docs_dir)?;
        write_atomic(&self.path(node_id), content.as_bytes())?;
        Ok(())
    }

    /// A node created before any content write reads as empty
    pub(crate) fn read_or_empty(&self, node_id: &str) -> Result<String> {
        match fs::read_to_string(self.path(node_id)) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}
