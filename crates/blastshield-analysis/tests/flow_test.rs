//! Flow analyser tests: nullable returns, tainted parameter flow with
//! aliasing and sanitisers, shared-container mutation facts.

use blastshield_analysis::flow::{FlowAnalyzer, FlowIndex, SinkKind};
use blastshield_analysis::parsers::python;
use blastshield_core::types::ast::ModuleAST;

fn analyze(source: &str, path: &str) -> (ModuleAST, FlowIndex) {
    let ast = python::extract(source, path);
    assert!(!ast.parse_error);
    let analyzer = FlowAnalyzer::new(vec![
        "shlex.quote".into(),
        "re.escape".into(),
        "html.escape".into(),
        "int".into(),
    ]);
    let flow = analyzer.analyze(std::slice::from_ref(&ast));
    (ast, flow)
}

// ---- Nullable returns ----

#[test]
fn non_optional_annotation_with_bare_return_is_nullable() {
    let (_, flow) = analyze(
        r#"
def lookup(key) -> int:
    if key:
        return 1
    return
"#,
        "m.py",
    );
    assert!(flow.get("m::lookup").unwrap().nullable_return);
}

#[test]
fn fall_through_counts_as_nullable_but_optional_does_not() {
    let (_, flow) = analyze(
        r#"
def falls(key) -> str:
    if key:
        return "x"

def fine(key) -> Optional[str]:
    return None

def unannotated(key):
    return
"#,
        "m.py",
    );
    assert!(flow.get("m::falls").unwrap().nullable_return);
    assert!(!flow.get("m::fine").unwrap().nullable_return);
    assert!(!flow.get("m::unannotated").unwrap().nullable_return);
}

// ---- Taint ----

#[test]
fn parameter_reaching_shell_sink_is_tainted() {
    let (_, flow) = analyze(
        r#"
import os

def run(cmd):
    os.system(cmd)
"#,
        "m.py",
    );
    let facts = flow.get("m::run").unwrap();
    assert_eq!(facts.tainted_sinks.len(), 1);
    let sink = &facts.tainted_sinks[0];
    assert_eq!(sink.parameter, "cmd");
    assert_eq!(sink.sink, "os.system");
    assert_eq!(sink.kind, SinkKind::Shell);
    assert!(sink.via_alias.is_none());
}

#[test]
fn taint_follows_simple_aliases() {
    let (_, flow) = analyze(
        r#"
import subprocess

def run(cmd):
    target = cmd
    subprocess.run(target)
"#,
        "m.py",
    );
    let facts = flow.get("m::run").unwrap();
    assert_eq!(facts.tainted_sinks.len(), 1);
    let sink = &facts.tainted_sinks[0];
    assert_eq!(sink.parameter, "cmd");
    assert_eq!(sink.via_alias.as_deref(), Some("target"));
    assert_eq!(sink.kind, SinkKind::Subprocess);
}

#[test]
fn sanitiser_interposition_clears_the_taint() {
    let (_, flow) = analyze(
        r#"
import os
import shlex

def run(cmd):
    shlex.quote(cmd)
    os.system(cmd)
"#,
        "m.py",
    );
    assert!(flow.get("m::run").unwrap().tainted_sinks.is_empty());
}

#[test]
fn from_imported_sinks_are_canonicalised() {
    let (_, flow) = analyze(
        r#"
from os import system

def run(cmd):
    system(cmd)
"#,
        "m.py",
    );
    let facts = flow.get("m::run").unwrap();
    assert_eq!(facts.tainted_sinks[0].sink, "os.system");
}

#[test]
fn sql_execute_with_tainted_argument_is_a_sink() {
    let (_, flow) = analyze(
        r#"
def query(user_id, cursor):
    cursor.execute("select * from users where id = %s" % user_id)
"#,
        "m.py",
    );
    let facts = flow.get("m::query").unwrap();
    assert!(facts
        .tainted_sinks
        .iter()
        .any(|s| s.kind == SinkKind::Sql && s.parameter == "user_id"));
}

#[test]
fn literal_arguments_carry_no_taint() {
    let (_, flow) = analyze(
        r#"
import os

def run(cmd):
    os.system("ls -la")
"#,
        "m.py",
    );
    assert!(flow.get("m::run").unwrap().tainted_sinks.is_empty());
}

// ---- Shared mutation ----

#[test]
fn shared_container_mutations_are_listed_per_function() {
    let (_, flow) = analyze(
        r#"
registry = {}
log = []

def record(event):
    registry[event] = 1
    log.append(event)

def read():
    return registry
"#,
        "m.py",
    );
    let record = flow.get("m::record").unwrap();
    assert_eq!(record.mutated_shared, vec!["log", "registry"]);
    assert!(flow.get("m::read").unwrap().mutated_shared.is_empty());
    assert!(flow.mutates_shared("m::record"));
}
