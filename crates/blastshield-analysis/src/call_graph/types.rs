//! Call-graph node, edge, and container types on petgraph.

use blastshield_core::types::ast::ContainerKind;
use blastshield_core::{FxHashMap, FxHashSet};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};

/// Key of the sentinel node that absorbs unresolved call sites.
pub const EXTERNAL_NODE: &str = "external";

/// One function definition in the graph.
#[derive(Debug, Clone)]
pub struct FunctionNode {
    /// Qualified key: `module::function` (or `module::Class.method`).
    pub key: String,
    pub file: String,
    pub name: String,
    pub module_id: String,
    pub line: u32,
    pub end_line: u32,
    pub is_async: bool,
    pub is_entry_point: bool,
}

/// A resolved (or external) call edge.
#[derive(Debug, Clone, Copy)]
pub struct CallEdge {
    pub line: u32,
    pub awaited: bool,
    /// The call is a bare expression statement whose value is discarded.
    pub discarded: bool,
    /// Caller and callee differ in sync/async kind, or an async caller
    /// invokes without awaiting.
    pub async_boundary_crossing: bool,
}

/// Readers and writers of one module-level mutable container.
#[derive(Debug, Clone)]
pub struct SharedState {
    pub container: ContainerKind,
    pub file: String,
    pub line: u32,
    /// Function keys that read the container.
    pub readers: FxHashSet<String>,
    /// Function keys that write to it (assignment, mutating method,
    /// index assignment).
    pub writers: FxHashSet<String>,
}

/// The scan-wide call graph.
pub struct CallGraph {
    pub graph: StableDiGraph<FunctionNode, CallEdge>,
    node_index: FxHashMap<String, NodeIndex>,
    external: NodeIndex,
    /// Shared-state map keyed by fully-qualified module variable
    /// (`module::var`).
    pub shared_state: FxHashMap<String, SharedState>,
}

impl CallGraph {
    pub fn new() -> Self {
        let mut graph = StableDiGraph::new();
        let external = graph.add_node(FunctionNode {
            key: EXTERNAL_NODE.to_string(),
            file: String::new(),
            name: EXTERNAL_NODE.to_string(),
            module_id: String::new(),
            line: 0,
            end_line: 0,
            is_async: false,
            is_entry_point: false,
        });
        let mut node_index = FxHashMap::default();
        node_index.insert(EXTERNAL_NODE.to_string(), external);
        Self {
            graph,
            node_index,
            external,
            shared_state: FxHashMap::default(),
        }
    }

    pub fn add_function(&mut self, node: FunctionNode) -> NodeIndex {
        let key = node.key.clone();
        let idx = self.graph.add_node(node);
        self.node_index.insert(key, idx);
        idx
    }

    pub fn get_node(&self, key: &str) -> Option<NodeIndex> {
        self.node_index.get(key).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &FunctionNode {
        &self.graph[idx]
    }

    pub fn external(&self) -> NodeIndex {
        self.external
    }

    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: CallEdge) {
        self.graph.add_edge(from, to, edge);
    }

    /// Number of function nodes, excluding the external sentinel.
    pub fn function_count(&self) -> usize {
        self.graph.node_count().saturating_sub(1)
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn entry_points(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph[idx].is_entry_point)
    }

    /// Keys of all function nodes (excluding the sentinel), for validation
    /// and prompt assembly.
    pub fn node_keys(&self) -> impl Iterator<Item = &str> {
        self.node_index
            .keys()
            .map(|k| k.as_str())
            .filter(|k| *k != EXTERNAL_NODE)
    }
}

impl Default for CallGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Build statistics, logged per scan.
#[derive(Debug, Clone, Default)]
pub struct CallGraphStats {
    pub total_functions: usize,
    pub total_edges: usize,
    pub entry_points: usize,
    pub resolved_calls: usize,
    pub external_calls: usize,
}
