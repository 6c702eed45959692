//! Error types for doctree

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Document not found: {0}")]
    NodeNotFound(String),

    #[error("Reference not found: {0}")]
    ReferenceNotFound(String),

    #[error("Relationship not found: {0}")]
    RelationNotFound(String),

    #[error("Snapshot version {version} not found for {node}")]
    SnapshotNotFound { node: String, version: u64 },

    #[error("Version mismatch on {node}: expected {expected}, found {actual}")]
    VersionMismatch {
        node: String,
        expected: u64,
        actual: u64,
    },

    #[error("Hierarchy depth {0} exceeds the maximum level")]
    HierarchyOverflow(u32),

    #[error("Children limit reached on {0}")]
    ChildrenLimitReached(String),

    #[error("Invalid anchor: {0}")]
    InvalidAnchor(String),

    #[error("Relationship cycle detected: {0}")]
    CycleDetected(String),

    #[error("Relationship already exists: {0}")]
    DuplicateRelation(String),

    #[error("Invalid document type: {0}")]
    InvalidType(String),

    #[error("Invalid reference status: {0}")]
    InvalidStatus(String),

    #[error("Invalid analysis mode: {0}")]
    InvalidMode(String),

    #[error("Invalid title: {0}")]
    InvalidTitle(String),

    #[error("Store not initialized. Run 'doctree init' first.")]
    NotInitialized,

    #[error("Store already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
