//! Impact analysis: who depends on what
//!
//! Breadth-first traversal over a graph assembled from two edge sources: the
//! explicit parent_id hierarchy and the typed relationship edges. The whole
//! analysis runs under the shared index lock, so the result reflects one
//! consistent view of the graph at the cost of blocking writers. Every
//! traversal is capped at depth 10: bounded latency on malformed or deeply
//! cyclic data beats exhaustive discovery here.

use crate::index::{DocumentIndex, IndexState};
use crate::model::{ReferenceStatus, RelationKind};
use crate::Result;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

/// Hard ceiling on BFS depth, regardless of graph size
pub const MAX_TRAVERSAL_DEPTH: u32 = 10;

/// What to discover; modes are independent and composable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    Parents,
    Children,
    References,
    Dependencies,
    All,
}

impl std::str::FromStr for AnalysisMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "parents" => Ok(AnalysisMode::Parents),
            "children" => Ok(AnalysisMode::Children),
            "references" => Ok(AnalysisMode::References),
            "dependencies" => Ok(AnalysisMode::Dependencies),
            "all" => Ok(AnalysisMode::All),
            _ => Err(crate::Error::InvalidMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisMode::Parents => write!(f, "parents"),
            AnalysisMode::Children => write!(f, "children"),
            AnalysisMode::References => write!(f, "references"),
            AnalysisMode::Dependencies => write!(f, "dependencies"),
            AnalysisMode::All => write!(f, "all"),
        }
    }
}

/// Transient analysis result; never persisted
#[derive(Debug, Clone, Serialize)]
pub struct ImpactResult {
    pub node_id: String,
    pub parents: Vec<String>,
    pub children: Vec<String>,
    /// Task ids referencing this document plus documents sharing an active
    /// reference task with it, merged into one deduplicated list
    pub references: Vec<String>,
    pub dependencies: Vec<String>,
    /// First-discovery depth; direct neighbors of the origin are at 0
    pub depth: BTreeMap<String, u32>,
    /// One reconstructed path per discovered node, first discovery wins
    pub paths: BTreeMap<String, Vec<String>>,
}

impl ImpactResult {
    fn new(node_id: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            parents: Vec::new(),
            children: Vec::new(),
            references: Vec::new(),
            dependencies: Vec::new(),
            depth: BTreeMap::new(),
            paths: BTreeMap::new(),
        }
    }
}

#[derive(Clone)]
pub struct ImpactAnalyzer {
    index: Arc<DocumentIndex>,
}

impl ImpactAnalyzer {
    pub(crate) fn new(index: Arc<DocumentIndex>) -> Self {
        Self { index }
    }

    /// Run the requested modes against one consistent snapshot of the graph
    pub fn analyze(&self, node_id: &str, modes: &[AnalysisMode]) -> Result<ImpactResult> {
        self.index.read(|state| {
            state.node(node_id)?;

            let graph = ImpactGraph::build(state);
            let mut result = ImpactResult::new(node_id);
            for mode in modes {
                match mode {
                    AnalysisMode::Parents => graph.parents(node_id, &mut result),
                    AnalysisMode::Children => graph.children(node_id, &mut result),
                    AnalysisMode::References => references(state, node_id, &mut result),
                    AnalysisMode::Dependencies => graph.dependencies(node_id, &mut result),
                    AnalysisMode::All => {
                        graph.parents(node_id, &mut result);
                        graph.children(node_id, &mut result);
                        references(state, node_id, &mut result);
                        graph.dependencies(node_id, &mut result);
                    }
                }
            }
            Ok(result)
        })
    }
}

/// Edge classes in the assembled graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeKind {
    /// parent -> child, from the explicit parent_id field
    Hierarchy,
    /// from -> to, from a relationship edge
    Relation(RelationKind),
}

impl EdgeKind {
    /// Hierarchy edges and ParentChild relation edges both express
    /// parent/child structure; traversals treat them as one relation.
    fn is_structural(&self) -> bool {
        matches!(
            self,
            EdgeKind::Hierarchy | EdgeKind::Relation(RelationKind::ParentChild)
        )
    }
}

/// Directed graph over document ids, assembled under the read lock
struct ImpactGraph {
    graph: DiGraph<String, EdgeKind>,
    nodes: BTreeMap<String, NodeIndex>,
}

impl ImpactGraph {
    fn build(state: &IndexState) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = BTreeMap::new();

        for id in state.docs.keys() {
            let idx = graph.add_node(id.clone());
            nodes.insert(id.clone(), idx);
        }

        for node in state.docs.values() {
            if let Some(parent_id) = &node.parent_id {
                if let (Some(&p), Some(&c)) = (nodes.get(parent_id), nodes.get(&node.id)) {
                    graph.add_edge(p, c, EdgeKind::Hierarchy);
                }
            }
        }
        // BTreeMap order makes edge insertion order reproducible
        for rel in state.relationships.values() {
            if let (Some(&f), Some(&t)) = (nodes.get(&rel.from_id), nodes.get(&rel.to_id)) {
                graph.add_edge(f, t, EdgeKind::Relation(rel.kind));
            }
        }

        Self { graph, nodes }
    }

    fn parents(&self, origin: &str, result: &mut ImpactResult) {
        let mut found = Vec::new();
        self.bfs(
            origin,
            |idx| self.neighbors(idx, Direction::Incoming, EdgeKind::is_structural),
            &mut found,
            result,
        );
        merge(&mut result.parents, found);
    }

    fn children(&self, origin: &str, result: &mut ImpactResult) {
        let mut found = Vec::new();
        self.bfs(
            origin,
            |idx| self.neighbors(idx, Direction::Outgoing, EdgeKind::is_structural),
            &mut found,
            result,
        );
        merge(&mut result.children, found);
    }

    fn dependencies(&self, origin: &str, result: &mut ImpactResult) {
        let mut found = Vec::new();
        self.bfs(
            origin,
            |idx| {
                self.neighbors(idx, Direction::Outgoing, |kind| {
                    matches!(kind, EdgeKind::Relation(k) if *k != RelationKind::ParentChild)
                })
            },
            &mut found,
            result,
        );
        merge(&mut result.dependencies, found);
    }

    /// Matching neighbors of `idx`, sorted by id for deterministic traversal
    fn neighbors(
        &self,
        idx: NodeIndex,
        direction: Direction,
        keep: impl Fn(&EdgeKind) -> bool,
    ) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, direction)
            .filter(|e| keep(e.weight()))
            .map(|e| match direction {
                Direction::Outgoing => e.target(),
                Direction::Incoming => e.source(),
            })
            .collect();
        out.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
        out.dedup();
        out
    }

    /// Level-bounded BFS. Discovered ids land in `found` in discovery order;
    /// depth and path maps are filled on first discovery only, so unioned
    /// modes never overwrite each other.
    fn bfs(
        &self,
        origin: &str,
        expand: impl Fn(NodeIndex) -> Vec<NodeIndex>,
        found: &mut Vec<String>,
        result: &mut ImpactResult,
    ) {
        let Some(&start) = self.nodes.get(origin) else {
            return;
        };

        let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
        let mut queue: VecDeque<(NodeIndex, u32)> = VecDeque::from([(start, 0)]);
        let mut trail: BTreeMap<NodeIndex, Vec<String>> = BTreeMap::from([(start, Vec::new())]);

        while let Some((current, dist)) = queue.pop_front() {
            if dist >= MAX_TRAVERSAL_DEPTH {
                continue;
            }
            for next in expand(current) {
                if !visited.insert(next) {
                    continue;
                }
                let id = self.graph[next].clone();
                let mut path = trail.get(&current).cloned().unwrap_or_default();
                path.push(id.clone());
                trail.insert(next, path.clone());

                found.push(id.clone());
                result.depth.entry(id.clone()).or_insert(dist);
                result.paths.entry(id).or_insert(path);

                queue.push_back((next, dist + 1));
            }
        }
    }
}

/// One-hop reference impact, deliberately not transitive: tasks actively
/// referencing the document, plus documents co-referenced by those tasks.
fn references(state: &IndexState, origin: &str, result: &mut ImpactResult) {
    let mut found = Vec::new();

    for r in state.refs_for_doc(origin) {
        if r.status == ReferenceStatus::Active {
            found.push(r.task_id.clone());
        }
    }

    for ids in state.refs_by_task.values() {
        let refs: Vec<_> = ids
            .iter()
            .filter_map(|id| state.references.get(id))
            .filter(|r| r.status == ReferenceStatus::Active)
            .collect();
        if !refs.iter().any(|r| r.document_id == origin) {
            continue;
        }
        for r in refs {
            if r.document_id != origin {
                found.push(r.document_id.clone());
            }
        }
    }

    merge(&mut result.references, found);
}

/// Append while preserving discovery order and dropping duplicates
fn merge(target: &mut Vec<String>, found: Vec<String>) {
    for id in found {
        if !target.contains(&id) {
            target.push(id);
        }
    }
}
