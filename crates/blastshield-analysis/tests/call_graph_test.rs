//! Call-graph tests: resolution strategies, the external sentinel, entry
//! points, blast radius under cycles, async boundary crossing, and the
//! shared-state map.

use blastshield_analysis::call_graph::traversal::{
    async_reachable, blast_radius, boundary_crossing_functions, subgraph_within,
};
use blastshield_analysis::call_graph::CallGraphBuilder;
use blastshield_analysis::parsers::python;
use blastshield_core::types::ast::ModuleAST;

fn parse(source: &str, path: &str) -> ModuleAST {
    let ast = python::extract(source, path);
    assert!(!ast.parse_error, "fixture must parse: {path}");
    ast
}

fn build(modules: &[ModuleAST]) -> blastshield_analysis::call_graph::CallGraph {
    CallGraphBuilder::new(10).build(modules).0
}

// ---- Resolution ----

#[test]
fn same_module_calls_resolve_to_local_definitions() {
    let module = parse(
        r#"
def helper():
    return 1

def caller():
    return helper()
"#,
        "app.py",
    );
    let graph = build(&[module]);

    let caller = graph.get_node("app::caller").unwrap();
    let helper = graph.get_node("app::helper").unwrap();
    assert!(graph.graph.find_edge(caller, helper).is_some());
}

#[test]
fn from_imports_resolve_across_modules_with_aliases() {
    let util = parse("def fetch():\n    return 1\n", "util.py");
    let app = parse(
        r#"
from util import fetch as grab

def main():
    return grab()
"#,
        "app.py",
    );
    let graph = build(&[util, app]);

    let caller = graph.get_node("app::main").unwrap();
    let callee = graph.get_node("util::fetch").unwrap();
    assert!(graph.graph.find_edge(caller, callee).is_some());
}

#[test]
fn module_alias_dotted_calls_resolve() {
    let util = parse("def fetch():\n    return 1\n", "util.py");
    let app = parse(
        r#"
import util as u

def main():
    return u.fetch()
"#,
        "app.py",
    );
    let graph = build(&[util, app]);
    let caller = graph.get_node("app::main").unwrap();
    let callee = graph.get_node("util::fetch").unwrap();
    assert!(graph.graph.find_edge(caller, callee).is_some());
}

#[test]
fn unresolved_calls_go_to_the_external_sentinel() {
    let module = parse(
        r#"
def caller():
    return mystery()
"#,
        "app.py",
    );
    let graph = build(&[module]);
    let caller = graph.get_node("app::caller").unwrap();
    assert!(graph.graph.find_edge(caller, graph.external()).is_some());
    // The sentinel is not a function.
    assert_eq!(graph.function_count(), 1);
}

// ---- Entry points ----

#[test]
fn route_decorators_and_main_are_entry_points() {
    let module = parse(
        r#"
@app.route("/health")
def health():
    return "ok"

def main():
    health()

def helper():
    pass
"#,
        "app.py",
    );
    let graph = build(&[module]);
    let entries: Vec<String> = graph
        .entry_points()
        .map(|idx| graph.node(idx).key.clone())
        .collect();
    assert!(entries.contains(&"app::health".to_string()));
    assert!(entries.contains(&"app::main".to_string()));
    assert!(!entries.contains(&"app::helper".to_string()));
}

// ---- Blast radius ----

#[test]
fn blast_radius_counts_bfs_depth_not_node_count() {
    let module = parse(
        r#"
def a():
    b()
    c()

def b():
    d()

def c():
    pass

def d():
    pass
"#,
        "chain.py",
    );
    let graph = build(&[module]);
    let a = graph.get_node("chain::a").unwrap();
    assert_eq!(blast_radius(&graph, a, 10), 2);

    let d = graph.get_node("chain::d").unwrap();
    assert_eq!(blast_radius(&graph, d, 10), 0);
}

#[test]
fn cycles_terminate_and_respect_the_depth_bound() {
    let module = parse(
        r#"
def ping():
    pong()

def pong():
    ping()
"#,
        "cycle.py",
    );
    let graph = build(&[module]);
    let ping = graph.get_node("cycle::ping").unwrap();
    // Revisits are skipped: the cycle contributes one hop, not infinity.
    assert_eq!(blast_radius(&graph, ping, 10), 1);
    assert_eq!(blast_radius(&graph, ping, 0), 0);
}

#[test]
fn external_edges_contribute_no_depth() {
    let module = parse(
        r#"
def run(x):
    return eval(x)
"#,
        "a.py",
    );
    let graph = build(&[module]);
    let run = graph.get_node("a::run").unwrap();
    assert_eq!(blast_radius(&graph, run, 10), 0);
}

// ---- Async boundaries ----

#[test]
fn unawaited_async_call_flags_the_edge_and_the_caller() {
    let module = parse(
        r#"
async def a():
    pass

async def b():
    a()
"#,
        "s2.py",
    );
    let graph = build(&[module]);
    let b = graph.get_node("s2::b").unwrap();
    let a = graph.get_node("s2::a").unwrap();
    let edge = graph.graph.find_edge(b, a).unwrap();
    assert!(graph.graph[edge].async_boundary_crossing);
    assert!(!graph.graph[edge].awaited);

    let crossing = boundary_crossing_functions(&graph);
    assert!(crossing.contains("s2::b"));
}

#[test]
fn sync_to_async_calls_cross_the_boundary_but_awaited_async_calls_do_not() {
    let module = parse(
        r#"
async def task():
    pass

def sync_caller():
    task()

async def async_caller():
    await task()
"#,
        "m.py",
    );
    let graph = build(&[module]);

    let sync_caller = graph.get_node("m::sync_caller").unwrap();
    let task = graph.get_node("m::task").unwrap();
    let edge = graph.graph.find_edge(sync_caller, task).unwrap();
    assert!(graph.graph[edge].async_boundary_crossing);

    let async_caller = graph.get_node("m::async_caller").unwrap();
    let edge = graph.graph.find_edge(async_caller, task).unwrap();
    assert!(!graph.graph[edge].async_boundary_crossing);
}

// ---- Shared state ----

#[test]
fn shared_state_map_tracks_writers_and_readers() {
    let module = parse(
        r#"
state = {}

async def write_a():
    state['a'] = 1

async def write_b():
    state['b'] = 2

def read():
    return state
"#,
        "s3.py",
    );
    let graph = build(&[module]);

    let shared = graph.shared_state.get("s3::state").unwrap();
    assert!(shared.writers.contains("s3::write_a"));
    assert!(shared.writers.contains("s3::write_b"));
    assert!(shared.readers.contains("s3::read"));

    let reach = async_reachable(&graph, 10);
    assert!(reach.contains("s3::write_a"));
    assert!(reach.contains("s3::write_b"));
    assert!(!reach.contains("s3::read"));
}

// ---- Subgraph extraction ----

#[test]
fn subgraph_is_bounded_by_hops() {
    let module = parse(
        r#"
def a():
    b()

def b():
    c()

def c():
    pass
"#,
        "m.py",
    );
    let graph = build(&[module]);
    let a = graph.get_node("m::a").unwrap();

    let one_hop = subgraph_within(&graph, a, 1);
    assert_eq!(one_hop.len(), 1);
    assert_eq!(one_hop[0].0, "m::a");

    let two_hops = subgraph_within(&graph, a, 2);
    assert_eq!(two_hops.len(), 2);
}
