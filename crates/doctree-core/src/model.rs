//! Data model for the doctree store
//!
//! Document nodes form a tree (parent_id + level + position). Relationships
//! are typed edges between documents, independent of the hierarchy.
//! References link external tasks to documents and carry a staleness status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Maximum permitted tree depth (root = 1)
pub const MAX_LEVEL: u32 = 5;

/// Maximum direct children per node
pub const MAX_CHILDREN_PER_NODE: usize = 50;

/// Synthetic parent of all root documents in tree queries
pub const VIRTUAL_ROOT: &str = "virtual_root";

/// Document type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    FeatureList,
    Architecture,
    TechDesign,
    Background,
    Requirements,
    Meeting,
    #[default]
    Task,
}

impl std::str::FromStr for DocumentType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "feature_list" | "feature-list" => Ok(DocumentType::FeatureList),
            "architecture" => Ok(DocumentType::Architecture),
            "tech_design" | "tech-design" => Ok(DocumentType::TechDesign),
            "background" => Ok(DocumentType::Background),
            "requirements" => Ok(DocumentType::Requirements),
            "meeting" => Ok(DocumentType::Meeting),
            "task" => Ok(DocumentType::Task),
            _ => Err(crate::Error::InvalidType(s.to_string())),
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentType::FeatureList => write!(f, "feature_list"),
            DocumentType::Architecture => write!(f, "architecture"),
            DocumentType::TechDesign => write!(f, "tech_design"),
            DocumentType::Background => write!(f, "background"),
            DocumentType::Requirements => write!(f, "requirements"),
            DocumentType::Meeting => write!(f, "meeting"),
            DocumentType::Task => write!(f, "task"),
        }
    }
}

/// Metadata entry for one document in the tree
///
/// Content bodies live in separate files addressed by `id` (live) and by
/// `(id, version)` (history); only metadata is kept in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentNode {
    /// Unique identifier (doc-xxxxxxxx)
    pub id: String,

    /// Parent document, None for roots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Document title
    pub title: String,

    /// Document type
    #[serde(rename = "type")]
    pub doc_type: DocumentType,

    /// Depth in the tree, root = 1
    pub level: u32,

    /// Order among siblings
    pub position: u32,

    /// Content version, starts at 1, bumped on every content update
    pub version: u64,

    /// When the document was created
    pub created_at: DateTime<Utc>,

    /// When metadata or content last changed
    pub updated_at: DateTime<Utc>,
}

impl DocumentNode {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Synthetic wrapper node used when a tree query names no root
    pub(crate) fn virtual_root() -> Self {
        let now = Utc::now();
        Self {
            id: VIRTUAL_ROOT.to_string(),
            parent_id: None,
            title: "Root".to_string(),
            doc_type: DocumentType::default(),
            level: 0,
            position: 0,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Kind of a relationship edge
///
/// ParentChild and Sibling duplicate the tree structure as explicit edges;
/// Reference edges are user-created cross-document dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    ParentChild,
    Sibling,
    Reference,
}

impl std::str::FromStr for RelationKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parent_child" | "parent-child" => Ok(RelationKind::ParentChild),
            "sibling" => Ok(RelationKind::Sibling),
            "reference" => Ok(RelationKind::Reference),
            _ => Err(crate::Error::InvalidType(s.to_string())),
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationKind::ParentChild => write!(f, "parent_child"),
            RelationKind::Sibling => write!(f, "sibling"),
            RelationKind::Reference => write!(f, "reference"),
        }
    }
}

/// Refinement of Reference relations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Data,
    Interface,
    Config,
}

impl std::str::FromStr for DependencyKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "data" => Ok(DependencyKind::Data),
            "interface" => Ok(DependencyKind::Interface),
            "config" => Ok(DependencyKind::Config),
            _ => Err(crate::Error::InvalidType(s.to_string())),
        }
    }
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyKind::Data => write!(f, "data"),
            DependencyKind::Interface => write!(f, "interface"),
            DependencyKind::Config => write!(f, "config"),
        }
    }
}

/// Typed directed edge between two documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// Unique identifier (rel-xxxxxxxx)
    pub id: String,

    pub from_id: String,

    pub to_id: String,

    #[serde(rename = "type")]
    pub kind: RelationKind,

    /// Only meaningful for Reference edges
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_kind: Option<DependencyKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Lifecycle status of a task-document reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceStatus {
    #[default]
    Active,
    /// Target document changed since the reference was made
    Outdated,
    Broken,
}

impl std::str::FromStr for ReferenceStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ReferenceStatus::Active),
            "outdated" => Ok(ReferenceStatus::Outdated),
            "broken" => Ok(ReferenceStatus::Broken),
            _ => Err(crate::Error::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for ReferenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceStatus::Active => write!(f, "active"),
            ReferenceStatus::Outdated => write!(f, "outdated"),
            ReferenceStatus::Broken => write!(f, "broken"),
        }
    }
}

/// Link from an external task to a document
///
/// task_id is an opaque foreign key supplied by the task-management caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    /// Unique identifier (ref-xxxxxxxx)
    pub id: String,

    pub task_id: String,

    pub document_id: String,

    /// Optional locator inside the document (max 120 code points, no CR/LF/TAB)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    pub status: ReferenceStatus,

    pub version: u64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Tree query result: a node with its expanded children
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub node: DocumentNode,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

/// One entry in a document's version history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub path: PathBuf,
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_round_trip() {
        for s in [
            "feature_list",
            "architecture",
            "tech_design",
            "background",
            "requirements",
            "meeting",
            "task",
        ] {
            let t: DocumentType = s.parse().unwrap();
            assert_eq!(t.to_string(), s);
        }
        assert!("blog_post".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_reference_status_parse() {
        assert_eq!(
            "outdated".parse::<ReferenceStatus>().unwrap(),
            ReferenceStatus::Outdated
        );
        assert!("stale".parse::<ReferenceStatus>().is_err());
    }

    #[test]
    fn test_virtual_root_is_level_zero() {
        let root = DocumentNode::virtual_root();
        assert_eq!(root.level, 0);
        assert!(root.is_root());
    }
}
