//! Depth-bounded BFS over the call graph. Cycles are expected: each node
//! is visited at most once, and `max_depth` bounds the walk.

use std::collections::VecDeque;

use blastshield_core::FxHashSet;
use petgraph::graph::NodeIndex;
use petgraph::Direction;

use super::types::CallGraph;

/// Forward BFS from `start`: every function reachable through outgoing
/// call edges, within `max_depth` hops.
pub fn bfs_forward(graph: &CallGraph, start: NodeIndex, max_depth: usize) -> Vec<NodeIndex> {
    let mut visited = FxHashSet::default();
    let mut queue = VecDeque::new();
    let mut result = Vec::new();

    visited.insert(start);
    queue.push_back((start, 0usize));

    while let Some((node, depth)) = queue.pop_front() {
        if node != start {
            result.push(node);
        }
        if depth >= max_depth {
            continue;
        }
        for neighbor in graph.graph.neighbors_directed(node, Direction::Outgoing) {
            // External edges are terminal: the sentinel is not a function
            // and contributes no depth.
            if neighbor == graph.external() {
                continue;
            }
            if visited.insert(neighbor) {
                queue.push_back((neighbor, depth + 1));
            }
        }
    }

    result
}

/// Blast radius of a node: the maximum BFS depth reached through outgoing
/// call edges, bounded by `max_depth`.
pub fn blast_radius(graph: &CallGraph, start: NodeIndex, max_depth: usize) -> usize {
    let mut visited = FxHashSet::default();
    let mut queue = VecDeque::new();
    let mut radius = 0usize;

    visited.insert(start);
    queue.push_back((start, 0usize));

    while let Some((node, depth)) = queue.pop_front() {
        radius = radius.max(depth);
        if depth >= max_depth {
            continue;
        }
        for neighbor in graph.graph.neighbors_directed(node, Direction::Outgoing) {
            if neighbor == graph.external() {
                continue;
            }
            if visited.insert(neighbor) {
                queue.push_back((neighbor, depth + 1));
            }
        }
    }

    radius
}

/// The set of function keys reachable from async entry points. An async
/// function is itself an asynchronous execution context, so async
/// functions count as roots even when nothing decorated reaches them.
pub fn async_reachable(graph: &CallGraph, max_depth: usize) -> FxHashSet<String> {
    let roots: Vec<NodeIndex> = graph
        .graph
        .node_indices()
        .filter(|&idx| graph.graph[idx].is_async)
        .collect();

    let mut reachable: FxHashSet<String> = FxHashSet::default();
    for root in roots {
        reachable.insert(graph.node(root).key.clone());
        for idx in bfs_forward(graph, root, max_depth) {
            reachable.insert(graph.node(idx).key.clone());
        }
    }
    reachable
}

/// Keys of functions that sit on an async boundary: they own at least one
/// edge flagged `async_boundary_crossing`.
pub fn boundary_crossing_functions(graph: &CallGraph) -> FxHashSet<String> {
    let mut keys = FxHashSet::default();
    for edge in graph.graph.edge_indices() {
        if graph.graph[edge].async_boundary_crossing {
            if let Some((from, _)) = graph.graph.edge_endpoints(edge) {
                keys.insert(graph.node(from).key.clone());
            }
        }
    }
    keys
}

/// Whether a node owns any outgoing async-boundary-crossing edge. Feeds
/// the scorer's async-boundary factor.
pub fn crosses_async_boundary(graph: &CallGraph, node: NodeIndex) -> bool {
    graph
        .graph
        .edges_directed(node, Direction::Outgoing)
        .any(|edge| edge.weight().async_boundary_crossing)
}

/// The subgraph within `hops` of a node, serialised as `(from, to, line)`
/// triples for prompt assembly.
pub fn subgraph_within(
    graph: &CallGraph,
    start: NodeIndex,
    hops: usize,
) -> Vec<(String, String, u32)> {
    let mut members: FxHashSet<NodeIndex> = FxHashSet::default();
    members.insert(start);
    for idx in bfs_forward(graph, start, hops) {
        members.insert(idx);
    }

    let mut edges = Vec::new();
    for edge in graph.graph.edge_indices() {
        if let Some((from, to)) = graph.graph.edge_endpoints(edge) {
            if members.contains(&from) && members.contains(&to) {
                edges.push((
                    graph.node(from).key.clone(),
                    graph.node(to).key.clone(),
                    graph.graph[edge].line,
                ));
            }
        }
    }
    edges.sort();
    edges
}
