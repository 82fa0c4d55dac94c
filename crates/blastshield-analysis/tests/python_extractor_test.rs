//! Python extractor tests: signatures, async flags, decorators, call
//! sites, imports, module assignments, exception summaries, failure
//! semantics.

use blastshield_analysis::parsers::python;
use blastshield_core::types::ast::{ContainerKind, Language, ReturnKind};

// ---- Signatures and flags ----

#[test]
fn extracts_function_signature_with_annotations_and_defaults() {
    let source = r#"
def fetch(url: str, retries: int = 3, *args, **kwargs) -> dict:
    return {}
"#;
    let ast = python::extract(source, "client.py");
    assert!(!ast.parse_error);
    assert_eq!(ast.module_id, "client");
    assert_eq!(ast.functions.len(), 1);

    let func = &ast.functions[0];
    assert_eq!(func.qualified_name, "client::fetch");
    assert_eq!(func.line, 2);
    assert!(!func.is_async);
    assert_eq!(func.return_annotation.as_deref(), Some("dict"));

    assert_eq!(func.params.len(), 4);
    assert_eq!(func.params[0].name, "url");
    assert_eq!(func.params[0].annotation.as_deref(), Some("str"));
    assert!(!func.params[0].has_default);
    assert_eq!(func.params[1].name, "retries");
    assert!(func.params[1].has_default);
    assert_eq!(func.params[2].name, "args");
    assert_eq!(func.params[3].name, "kwargs");
}

#[test]
fn async_functions_and_awaited_calls_are_flagged() {
    let source = r#"
async def inner():
    pass

async def outer():
    await inner()
    inner()
"#;
    let ast = python::extract(source, "tasks.py");
    let outer = ast.functions.iter().find(|f| f.name == "outer").unwrap();
    assert!(outer.is_async);

    let awaited: Vec<bool> = outer.call_sites.iter().map(|c| c.awaited).collect();
    assert_eq!(awaited, vec![true, false]);
    assert!(outer.call_sites[1].discarded);
}

#[test]
fn decorators_keep_name_and_argument_text() {
    let source = r#"
@app.route("/users", methods=["POST"])
def create_user():
    pass
"#;
    let ast = python::extract(source, "routes.py");
    let func = &ast.functions[0];
    assert_eq!(func.decorators.len(), 1);
    assert_eq!(func.decorators[0].name, "app.route");
    let args = func.decorators[0].args.as_deref().unwrap();
    assert!(args.contains("/users"));
}

#[test]
fn class_methods_are_qualified_by_class_name() {
    let source = r#"
class UserService:
    def find(self, user_id):
        return user_id

    async def refresh(self):
        pass
"#;
    let ast = python::extract(source, "svc.py");
    assert_eq!(ast.classes.len(), 1);
    let class = &ast.classes[0];
    assert_eq!(class.name, "UserService");
    assert_eq!(class.methods.len(), 2);
    assert_eq!(class.methods[0].qualified_name, "svc::UserService.find");
    assert!(class.methods[1].is_async);
}

#[test]
fn nested_functions_keep_their_calls_separate() {
    let source = r#"
def outer():
    def inner():
        eval("1")
    return inner
"#;
    let ast = python::extract(source, "m.py");
    let outer = &ast.functions[0];
    assert!(outer.call_sites.is_empty());
    assert_eq!(outer.nested.len(), 1);
    assert_eq!(outer.nested[0].qualified_name, "m::outer.inner");
    assert_eq!(outer.nested[0].call_sites.len(), 1);
    assert_eq!(outer.nested[0].call_sites[0].callee, "eval");
}

// ---- Imports ----

#[test]
fn imports_record_aliases_and_from_flag() {
    let source = r#"
import os
import subprocess as sp
from shlex import quote as q
"#;
    let ast = python::extract(source, "m.py");
    assert_eq!(ast.imports.len(), 3);

    assert_eq!(ast.imports[0].module, "os");
    assert!(!ast.imports[0].is_from);

    assert_eq!(ast.imports[1].module, "subprocess");
    assert_eq!(ast.imports[1].names[0].alias.as_deref(), Some("sp"));

    let from_import = &ast.imports[2];
    assert!(from_import.is_from);
    assert_eq!(from_import.module, "shlex");
    assert_eq!(from_import.names[0].name, "quote");
    assert_eq!(from_import.names[0].local_name(), "q");
}

// ---- Module assignments and global accesses ----

#[test]
fn module_assignments_infer_container_kinds() {
    let source = r#"
cache = {}
items = []
seen = set()
limit = 10
handle = get_handle()
"#;
    let ast = python::extract(source, "state.py");
    let kinds: Vec<(String, ContainerKind)> = ast
        .module_assignments
        .iter()
        .map(|a| (a.name.clone(), a.container))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("cache".to_string(), ContainerKind::Mapping),
            ("items".to_string(), ContainerKind::Sequence),
            ("seen".to_string(), ContainerKind::Set),
            ("limit".to_string(), ContainerKind::Scalar),
            ("handle".to_string(), ContainerKind::Unknown),
        ]
    );
}

#[test]
fn container_writes_are_detected_without_global_declarations() {
    let source = r#"
cache = {}

def store(key, value):
    cache[key] = value

def push(value):
    cache.update({1: value})

def shadow():
    cache = {}
"#;
    let ast = python::extract(source, "state.py");

    let store = ast.functions.iter().find(|f| f.name == "store").unwrap();
    assert!(store.global_accesses.iter().any(|a| a.name == "cache" && a.write));

    let push = ast.functions.iter().find(|f| f.name == "push").unwrap();
    assert!(push.global_accesses.iter().any(|a| a.name == "cache" && a.write));

    // Plain rebinding without `global` shadows locally, not a shared write.
    let shadow = ast.functions.iter().find(|f| f.name == "shadow").unwrap();
    assert!(!shadow.global_accesses.iter().any(|a| a.write));
}

#[test]
fn global_declaration_makes_rebinding_a_write() {
    let source = r#"
counter = 0

def bump():
    global counter
    counter = counter + 1
"#;
    let ast = python::extract(source, "state.py");
    let bump = &ast.functions[0];
    assert!(bump.global_accesses.iter().any(|a| a.name == "counter" && a.write));
}

// ---- Returns, loops, exceptions ----

#[test]
fn return_kinds_and_fall_through_are_recorded() {
    let source = r#"
def partial(flag) -> int:
    if flag:
        return 1
    print(flag)
"#;
    let ast = python::extract(source, "m.py");
    let func = &ast.functions[0];
    assert!(func.falls_through);
    assert_eq!(func.returns.len(), 1);
    assert_eq!(func.returns[0].kind, ReturnKind::Value);
}

#[test]
fn loop_spans_cover_their_bodies() {
    let source = r#"
def poll():
    while True:
        requests.get("http://x")
        time.sleep(1)
"#;
    let ast = python::extract(source, "m.py");
    let func = &ast.functions[0];
    assert_eq!(func.loops.len(), 1);
    let span = func.loops[0];
    assert!(func
        .call_sites
        .iter()
        .all(|c| c.line >= span.line && c.line <= span.end_line));
}

#[test]
fn exception_summary_classifies_handlers() {
    let source = r#"
def guarded():
    try:
        work()
    except ValueError:
        handle()

def swallow():
    try:
        work()
    except:
        pass

def reraise():
    try:
        work()
    except:
        raise
"#;
    let ast = python::extract(source, "m.py");

    let guarded = &ast.functions[0];
    assert!(guarded.exceptions.has_top_level_try);
    assert_eq!(guarded.exceptions.specific_handlers, 1);
    assert_eq!(guarded.exceptions.bare_handlers, 0);

    let swallow = &ast.functions[1];
    assert_eq!(swallow.exceptions.bare_handlers, 1);
    assert!(!swallow.exceptions.reraises);

    let reraise = &ast.functions[2];
    assert!(reraise.exceptions.reraises);
}

// ---- Failure semantics ----

#[test]
fn syntax_error_yields_empty_model_with_parse_error_flag() {
    let ast = python::extract("def broken(:\n", "broken.py");
    assert!(ast.parse_error);
    assert_eq!(ast.language, Language::Python);
    assert!(ast.functions.is_empty());
    assert!(ast.imports.is_empty());
}

#[test]
fn call_args_capture_literalness_and_names() {
    let source = r#"
def run(cmd):
    eval("1 + 1")
    eval(cmd)
"#;
    let ast = python::extract(source, "m.py");
    let func = &ast.functions[0];
    let literal = &func.call_sites[0].args[0];
    assert!(literal.is_string_literal);
    assert!(literal.names.is_empty());

    let tainted = &func.call_sites[1].args[0];
    assert!(!tainted.is_string_literal);
    assert_eq!(tainted.names.as_slice(), ["cmd".to_string()]);
}
