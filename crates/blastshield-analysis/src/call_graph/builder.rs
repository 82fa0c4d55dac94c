//! CallGraphBuilder — parallel node extraction via rayon, import-aware
//! edge resolution, entry-point marking, shared-state map construction.

use blastshield_core::types::ast::{FunctionDef, ModuleAST};
use blastshield_core::{FxHashMap, FxHashSet};
use rayon::prelude::*;

use super::types::{CallEdge, CallGraph, CallGraphStats, FunctionNode, SharedState};

/// Decorator names that mark a function as externally reachable. Unknown
/// decorators stay opaque; this allow-list is the only decorator semantics
/// the engine is taught.
const ENTRY_POINT_DECORATORS: &[&str] = &[
    "route", "get", "post", "put", "delete", "patch", "head", "options", "websocket", "api_view",
    "api_route",
];

pub struct CallGraphBuilder {
    max_graph_depth: usize,
}

impl CallGraphBuilder {
    pub fn new(max_graph_depth: usize) -> Self {
        Self { max_graph_depth }
    }

    pub fn max_graph_depth(&self) -> usize {
        self.max_graph_depth
    }

    /// Build a call graph from per-file module models.
    ///
    /// Phase 1: collect all function nodes (parallel via rayon).
    /// Phase 2: resolve call sites into edges; unresolved callees become
    /// edges to the `external` sentinel.
    pub fn build(&self, modules: &[ModuleAST]) -> (CallGraph, CallGraphStats) {
        let mut graph = CallGraph::new();

        let nodes: Vec<FunctionNode> = modules
            .par_iter()
            .flat_map_iter(|module| {
                let mut nodes = Vec::new();
                for func in module.all_functions() {
                    push_nodes(func, module, &mut nodes);
                }
                nodes
            })
            .collect();

        for node in nodes {
            graph.add_function(node);
        }

        // Per-module function name index and import alias maps, for
        // resolution.
        let mut module_funcs: FxHashMap<&str, FxHashMap<&str, String>> = FxHashMap::default();
        let mut module_aliases: FxHashMap<&str, FxHashMap<String, AliasTarget>> =
            FxHashMap::default();
        for module in modules {
            let funcs = module_funcs.entry(module.module_id.as_str()).or_default();
            for func in module.all_functions() {
                funcs.insert(func.name.as_str(), func.qualified_name.clone());
            }
            module_aliases.insert(module.module_id.as_str(), alias_map(module));
        }

        let mut stats = CallGraphStats::default();

        for module in modules {
            let aliases = &module_aliases[module.module_id.as_str()];
            for func in module.all_functions() {
                self.resolve_function(func, module, &module_funcs, aliases, &mut graph, &mut stats);
                for nested in &func.nested {
                    self.resolve_function(
                        nested,
                        module,
                        &module_funcs,
                        aliases,
                        &mut graph,
                        &mut stats,
                    );
                }
            }
        }

        mark_entry_points(&mut graph, modules);
        build_shared_state(&mut graph, modules);

        stats.total_functions = graph.function_count();
        stats.total_edges = graph.edge_count();
        stats.entry_points = graph.entry_points().count();
        tracing::debug!(
            functions = stats.total_functions,
            edges = stats.total_edges,
            entry_points = stats.entry_points,
            external = stats.external_calls,
            "call graph built"
        );

        (graph, stats)
    }

    fn resolve_function(
        &self,
        func: &FunctionDef,
        module: &ModuleAST,
        module_funcs: &FxHashMap<&str, FxHashMap<&str, String>>,
        aliases: &FxHashMap<String, AliasTarget>,
        graph: &mut CallGraph,
        stats: &mut CallGraphStats,
    ) {
        let Some(caller_idx) = graph.get_node(&func.qualified_name) else {
            return;
        };
        let caller_async = func.is_async;

        for call in &func.call_sites {
            let target = resolve_call(&call.callee, module, module_funcs, aliases);
            let (callee_idx, callee_async) = match target {
                Some(key) => match graph.get_node(&key) {
                    Some(idx) => {
                        let is_async = graph.node(idx).is_async;
                        stats.resolved_calls += 1;
                        (idx, Some(is_async))
                    }
                    None => {
                        stats.external_calls += 1;
                        (graph.external(), None)
                    }
                },
                None => {
                    stats.external_calls += 1;
                    (graph.external(), None)
                }
            };

            let crossing = match callee_async {
                Some(callee_async) => {
                    caller_async != callee_async || (caller_async && !call.awaited)
                }
                // External callee: sync/async kind unknown, no crossing claim.
                None => false,
            };

            graph.add_edge(
                caller_idx,
                callee_idx,
                CallEdge {
                    line: call.line,
                    awaited: call.awaited,
                    discarded: call.discarded,
                    async_boundary_crossing: crossing,
                },
            );
        }
    }
}

fn push_nodes(func: &FunctionDef, module: &ModuleAST, out: &mut Vec<FunctionNode>) {
    out.push(FunctionNode {
        key: func.qualified_name.clone(),
        file: module.path.clone(),
        name: func.name.clone(),
        module_id: module.module_id.clone(),
        line: func.line,
        end_line: func.end_line,
        is_async: func.is_async,
        is_entry_point: false,
    });
    for nested in &func.nested {
        push_nodes(nested, module, out);
    }
}

/// Where an imported local name points.
#[derive(Debug, Clone)]
enum AliasTarget {
    /// `from m import f [as g]` — the local name is a function.
    Function { qualified: String },
    /// `import m [as n]` — the local name is a module prefix.
    Module { module_id: String },
}

fn alias_map(module: &ModuleAST) -> FxHashMap<String, AliasTarget> {
    let mut aliases = FxHashMap::default();
    for import in &module.imports {
        if import.is_from {
            for name in &import.names {
                if name.name == "*" {
                    continue;
                }
                aliases.insert(
                    name.local_name().to_string(),
                    AliasTarget::Function {
                        qualified: format!("{}::{}", import.module, name.name),
                    },
                );
            }
        } else if let Some(name) = import.names.first() {
            // `import m as n`
            if let Some(alias) = &name.alias {
                aliases.insert(
                    alias.clone(),
                    AliasTarget::Module {
                        module_id: import.module.clone(),
                    },
                );
            }
        } else {
            // `import m`
            aliases.insert(
                import.module.clone(),
                AliasTarget::Module {
                    module_id: import.module.clone(),
                },
            );
        }
    }
    aliases
}

/// Resolution chain: same-module definition, then from-import binding,
/// then module-alias dotted path. Anything else is external.
fn resolve_call(
    callee: &str,
    module: &ModuleAST,
    module_funcs: &FxHashMap<&str, FxHashMap<&str, String>>,
    aliases: &FxHashMap<String, AliasTarget>,
) -> Option<String> {
    if let Some((prefix, rest)) = callee.split_once('.') {
        if let Some(AliasTarget::Module { module_id }) = aliases.get(prefix) {
            // Only a single attribute hop is resolvable: `m.f(...)`.
            if !rest.contains('.') {
                return Some(format!("{module_id}::{rest}"));
            }
        }
        return None;
    }

    if let Some(funcs) = module_funcs.get(module.module_id.as_str()) {
        if let Some(qualified) = funcs.get(callee) {
            return Some(qualified.clone());
        }
    }

    if let Some(AliasTarget::Function { qualified }) = aliases.get(callee) {
        return Some(qualified.clone());
    }

    None
}

/// Mark functions carrying a known route decorator, or named `main`, as
/// entry points.
fn mark_entry_points(graph: &mut CallGraph, modules: &[ModuleAST]) {
    let mut entry_keys: FxHashSet<String> = FxHashSet::default();
    for module in modules {
        for func in module.all_functions() {
            if is_entry_point_function(func) {
                entry_keys.insert(func.qualified_name.clone());
            }
        }
    }

    let indices: Vec<_> = graph.graph.node_indices().collect();
    for idx in indices {
        if entry_keys.contains(&graph.graph[idx].key) {
            if let Some(node) = graph.graph.node_weight_mut(idx) {
                node.is_entry_point = true;
            }
        }
    }
}

/// Shared entry-point predicate: route decorator allow-list or `main`.
pub fn is_entry_point_function(func: &FunctionDef) -> bool {
    func.name == "main" || has_entry_point_decorator(func)
}

fn has_entry_point_decorator(func: &FunctionDef) -> bool {
    func.decorators.iter().any(|d| {
        let last = d.name.rsplit('.').next().unwrap_or(&d.name);
        ENTRY_POINT_DECORATORS
            .iter()
            .any(|known| last.eq_ignore_ascii_case(known))
    })
}

/// Build the shared-state map: module-level mutable containers with the
/// function sets that read and write them.
fn build_shared_state(graph: &mut CallGraph, modules: &[ModuleAST]) {
    for module in modules {
        for assignment in &module.module_assignments {
            if !assignment.container.is_mutable_container() {
                continue;
            }
            let key = format!("{}::{}", module.module_id, assignment.name);
            let mut state = SharedState {
                container: assignment.container,
                file: module.path.clone(),
                line: assignment.line,
                readers: FxHashSet::default(),
                writers: FxHashSet::default(),
            };
            for func in module.all_functions() {
                collect_accesses(func, &assignment.name, &mut state);
            }
            graph.shared_state.insert(key, state);
        }
    }
}

fn collect_accesses(func: &FunctionDef, var: &str, state: &mut SharedState) {
    for access in &func.global_accesses {
        if access.name == var {
            if access.write {
                state.writers.insert(func.qualified_name.clone());
            } else {
                state.readers.insert(func.qualified_name.clone());
            }
        }
    }
    for nested in &func.nested {
        collect_accesses(nested, var, state);
    }
}
