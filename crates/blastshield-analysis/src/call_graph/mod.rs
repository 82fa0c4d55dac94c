//! Inter-procedural call graph with cross-module import resolution,
//! entry-point discovery, shared-state tracking, and blast-radius BFS.

pub mod builder;
pub mod traversal;
pub mod types;

pub use builder::CallGraphBuilder;
pub use types::{CallEdge, CallGraph, CallGraphStats, FunctionNode, SharedState};
