//! doctree-core: Core library for the doctree document store
//!
//! Maintains a hierarchy of versioned documents with cross-document
//! relationships, task references, content snapshots, and bounded
//! impact analysis. No daemon, no SQLite - just JSON files in .doctree/

pub mod config;
pub mod diff;
pub mod error;
pub mod id;
pub mod impact;
pub mod index;
pub mod model;
pub mod reference;
pub mod relation;
pub mod search;
pub mod snapshot;
pub mod store;
pub mod tree;
pub mod version;

mod content;
mod fsx;

pub use config::Config;
pub use diff::{DiffKind, DiffLine, DiffResult, DiffSummary};
pub use error::Error;
pub use id::generate_id;
pub use impact::{AnalysisMode, ImpactAnalyzer, ImpactResult, MAX_TRAVERSAL_DEPTH};
pub use index::DocumentIndex;
pub use model::{
    DependencyKind, DocumentNode, DocumentType, Reference, ReferenceStatus, RelationKind,
    Relationship, SnapshotMeta, TreeNode, MAX_CHILDREN_PER_NODE, MAX_LEVEL, VIRTUAL_ROOT,
};
pub use reference::{ReferenceStats, ReferenceTracker};
pub use relation::RelationshipStore;
pub use search::{MatchHighlight, SearchEngine, SearchOptions, SearchResult};
pub use snapshot::SnapshotManager;
pub use store::DocumentStore;
pub use tree::TreeStore;
pub use version::{VersionStore, LIVE_VERSION};

/// Result type for doctree operations
pub type Result<T> = std::result::Result<T, Error>;
