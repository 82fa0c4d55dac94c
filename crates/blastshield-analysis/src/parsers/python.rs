//! Python AST extractor — tree-sitter walk producing the module model.
//!
//! A syntax error never aborts a scan: the extractor returns an empty model
//! with `parse_error = true` and the pipeline attaches a synthetic violation.

use blastshield_core::types::ast::{
    module_id_from_path, CallArg, CallSite, ClassDef, ContainerKind, Decorator, ExceptionSummary,
    FunctionDef, GlobalAccess, ImportStmt, ImportedName, Language, LocalAlias, LoopSpan, ModuleAST,
    ModuleAssignment, Param, ReturnKind, ReturnSite,
};
use blastshield_core::FxHashSet;
use smallvec::SmallVec;
use tree_sitter::{Node, Parser};

/// Methods that mutate the container they are called on.
const MUTATING_METHODS: &[&str] = &[
    "append", "extend", "insert", "update", "add", "setdefault", "pop", "popitem", "remove",
    "discard", "clear", "sort", "reverse",
];

const MAX_ARG_TEXT: usize = 160;

/// Extract the module model for one Python file.
pub fn extract(source: &str, path: &str) -> ModuleAST {
    let module_id = module_id_from_path(path);
    let mut parser = Parser::new();
    if parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .is_err()
    {
        return ModuleAST::empty(module_id, path.to_string(), Language::Python, true);
    }

    let Some(tree) = parser.parse(source, None) else {
        return ModuleAST::empty(module_id, path.to_string(), Language::Python, true);
    };

    let root = tree.root_node();
    if root.has_error() {
        tracing::debug!(file = path, "syntax error, emitting empty module model");
        return ModuleAST::empty(module_id, path.to_string(), Language::Python, true);
    }

    let src = source.as_bytes();
    let module_names = collect_module_names(root, src);

    let mut ast = ModuleAST::empty(module_id.clone(), path.to_string(), Language::Python, false);

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "function_definition" => {
                let func =
                    extract_function(child, src, &module_id, None, Vec::new(), &module_names);
                ast.functions.push(func);
            }
            "decorated_definition" => {
                let decorators = extract_decorators(child, src);
                if let Some(def) = child.child_by_field_name("definition") {
                    match def.kind() {
                        "function_definition" => {
                            let func = extract_function(
                                def,
                                src,
                                &module_id,
                                None,
                                decorators,
                                &module_names,
                            );
                            ast.functions.push(func);
                        }
                        "class_definition" => {
                            let class =
                                extract_class(def, src, &module_id, decorators, &module_names);
                            ast.classes.push(class);
                        }
                        _ => {}
                    }
                }
            }
            "class_definition" => {
                let class = extract_class(child, src, &module_id, Vec::new(), &module_names);
                ast.classes.push(class);
            }
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                extract_imports(child, src, &mut ast.imports);
            }
            "expression_statement" => {
                if let Some(assign) = child.named_child(0) {
                    if assign.kind() == "assignment" {
                        extract_module_assignment(assign, src, &mut ast.module_assignments);
                    }
                }
            }
            _ => {}
        }
    }

    ast
}

/// Names assigned at module level. These seed shared-state tracking.
fn collect_module_names(root: Node, src: &[u8]) -> FxHashSet<String> {
    let mut names = FxHashSet::default();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() == "expression_statement" {
            if let Some(assign) = child.named_child(0) {
                if assign.kind() == "assignment" {
                    if let Some(left) = assign.child_by_field_name("left") {
                        if left.kind() == "identifier" {
                            names.insert(text(left, src).to_string());
                        }
                    }
                }
            }
        }
    }
    names
}

fn extract_module_assignment(assign: Node, src: &[u8], out: &mut Vec<ModuleAssignment>) {
    let Some(left) = assign.child_by_field_name("left") else {
        return;
    };
    if left.kind() != "identifier" {
        return;
    }
    let container = assign
        .child_by_field_name("right")
        .map(|right| infer_container(right, src))
        .unwrap_or(ContainerKind::Unknown);
    out.push(ModuleAssignment {
        name: text(left, src).to_string(),
        line: line(assign),
        container,
    });
}

fn infer_container(value: Node, src: &[u8]) -> ContainerKind {
    match value.kind() {
        "list" | "list_comprehension" | "tuple" => ContainerKind::Sequence,
        "dictionary" | "dictionary_comprehension" => ContainerKind::Mapping,
        "set" | "set_comprehension" => ContainerKind::Set,
        "string" | "concatenated_string" | "integer" | "float" | "true" | "false" | "none" => {
            ContainerKind::Scalar
        }
        "call" => {
            let callee = value
                .child_by_field_name("function")
                .map(|f| text(f, src))
                .unwrap_or("");
            match callee.rsplit('.').next().unwrap_or(callee) {
                "dict" | "defaultdict" | "OrderedDict" | "Counter" => ContainerKind::Mapping,
                "list" | "deque" => ContainerKind::Sequence,
                "set" | "frozenset" => ContainerKind::Set,
                _ => ContainerKind::Unknown,
            }
        }
        _ => ContainerKind::Unknown,
    }
}

fn extract_decorators(decorated: Node, src: &[u8]) -> Vec<Decorator> {
    let mut decorators = Vec::new();
    let mut cursor = decorated.walk();
    for child in decorated.children(&mut cursor) {
        if child.kind() != "decorator" {
            continue;
        }
        let Some(expr) = child.named_child(0) else {
            continue;
        };
        let (name, args) = match expr.kind() {
            "call" => {
                let name = expr
                    .child_by_field_name("function")
                    .map(|f| text(f, src).to_string())
                    .unwrap_or_default();
                let args = expr
                    .child_by_field_name("arguments")
                    .map(|a| text(a, src).trim_matches(&['(', ')'][..]).to_string());
                (name, args)
            }
            _ => (text(expr, src).to_string(), None),
        };
        decorators.push(Decorator {
            name,
            args,
            line: line(child),
        });
    }
    decorators
}

fn extract_imports(node: Node, src: &[u8], out: &mut Vec<ImportStmt>) {
    let is_from = node.kind() != "import_statement";
    if is_from {
        let module = node
            .child_by_field_name("module_name")
            .map(|m| text(m, src).to_string())
            .unwrap_or_default();
        let mut names = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "dotted_name" => {
                    // The module_name field is also a dotted_name; skip it.
                    if Some(child) == node.child_by_field_name("module_name") {
                        continue;
                    }
                    names.push(ImportedName {
                        name: text(child, src).to_string(),
                        alias: None,
                    });
                }
                "aliased_import" => {
                    let name = child
                        .child_by_field_name("name")
                        .map(|n| text(n, src).to_string())
                        .unwrap_or_default();
                    let alias = child
                        .child_by_field_name("alias")
                        .map(|a| text(a, src).to_string());
                    names.push(ImportedName { name, alias });
                }
                "wildcard_import" => {
                    names.push(ImportedName {
                        name: "*".to_string(),
                        alias: None,
                    });
                }
                _ => {}
            }
        }
        out.push(ImportStmt {
            module,
            names,
            is_from: true,
            line: line(node),
        });
    } else {
        // `import a, b.c as d` — one statement per imported module.
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "dotted_name" => out.push(ImportStmt {
                    module: text(child, src).to_string(),
                    names: Vec::new(),
                    is_from: false,
                    line: line(node),
                }),
                "aliased_import" => {
                    let module = child
                        .child_by_field_name("name")
                        .map(|n| text(n, src).to_string())
                        .unwrap_or_default();
                    let alias = child
                        .child_by_field_name("alias")
                        .map(|a| text(a, src).to_string());
                    out.push(ImportStmt {
                        module: module.clone(),
                        names: vec![ImportedName {
                            name: module,
                            alias,
                        }],
                        is_from: false,
                        line: line(node),
                    });
                }
                _ => {}
            }
        }
    }
}

fn extract_class(
    node: Node,
    src: &[u8],
    module_id: &str,
    decorators: Vec<Decorator>,
    module_names: &FxHashSet<String>,
) -> ClassDef {
    let name = node
        .child_by_field_name("name")
        .map(|n| text(n, src).to_string())
        .unwrap_or_default();
    let mut methods = Vec::new();

    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            match child.kind() {
                "function_definition" => {
                    methods.push(extract_function(
                        child,
                        src,
                        module_id,
                        Some(&name),
                        Vec::new(),
                        module_names,
                    ));
                }
                "decorated_definition" => {
                    let method_decorators = extract_decorators(child, src);
                    if let Some(def) = child.child_by_field_name("definition") {
                        if def.kind() == "function_definition" {
                            methods.push(extract_function(
                                def,
                                src,
                                module_id,
                                Some(&name),
                                method_decorators,
                                module_names,
                            ));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    ClassDef {
        name,
        line: line(node),
        end_line: end_line(node),
        decorators,
        methods,
    }
}

fn extract_function(
    node: Node,
    src: &[u8],
    module_id: &str,
    class_name: Option<&str>,
    decorators: Vec<Decorator>,
    module_names: &FxHashSet<String>,
) -> FunctionDef {
    let name = node
        .child_by_field_name("name")
        .map(|n| text(n, src).to_string())
        .unwrap_or_default();
    let qualified_name = match class_name {
        Some(class) => format!("{module_id}::{class}.{name}"),
        None => format!("{module_id}::{name}"),
    };
    let is_async = has_async_keyword(node);
    let params = node
        .child_by_field_name("parameters")
        .map(|p| extract_params(p, src))
        .unwrap_or_default();
    let return_annotation = node
        .child_by_field_name("return_type")
        .map(|r| text(r, src).to_string());

    let mut acc = BodyAcc {
        module_id,
        scope: &qualified_name.clone(),
        module_names,
        global_decls: FxHashSet::default(),
        calls: Vec::new(),
        globals: Vec::new(),
        aliases: Vec::new(),
        loops: Vec::new(),
        returns: Vec::new(),
        nested: Vec::new(),
        exceptions: ExceptionSummary::default(),
    };

    let mut falls_through = true;
    if let Some(body) = node.child_by_field_name("body") {
        collect_global_decls(body, src, &mut acc.global_decls);
        acc.exceptions.has_top_level_try = body
            .named_children(&mut body.walk())
            .any(|c| c.kind() == "try_statement");
        walk_body(body, src, &mut acc, false);
        if let Some(last) = last_named_child(body) {
            falls_through = !matches!(last.kind(), "return_statement" | "raise_statement");
        }
    }

    FunctionDef {
        qualified_name,
        name,
        line: line(node),
        end_line: end_line(node),
        params,
        return_annotation,
        decorators,
        is_async,
        nested: acc.nested,
        call_sites: acc.calls,
        global_accesses: acc.globals,
        local_aliases: acc.aliases,
        loops: acc.loops,
        returns: acc.returns,
        falls_through,
        exceptions: acc.exceptions,
    }
}

/// The `async` keyword is a child token of `function_definition` in the
/// current grammar; older grammars exposed it as a preceding sibling.
fn has_async_keyword(node: Node) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| c.kind() == "async")
        || node.prev_sibling().is_some_and(|p| p.kind() == "async")
}

fn extract_params(params: Node, src: &[u8]) -> Vec<Param> {
    let mut out = Vec::new();
    let mut cursor = params.walk();
    for child in params.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => out.push(Param {
                name: text(child, src).to_string(),
                annotation: None,
                has_default: false,
            }),
            "typed_parameter" => {
                let name = child
                    .named_child(0)
                    .map(|n| text(n, src).trim_start_matches('*').to_string())
                    .unwrap_or_default();
                let annotation = child
                    .child_by_field_name("type")
                    .map(|t| text(t, src).to_string());
                out.push(Param {
                    name,
                    annotation,
                    has_default: false,
                });
            }
            "default_parameter" | "typed_default_parameter" => {
                let name = child
                    .child_by_field_name("name")
                    .map(|n| text(n, src).to_string())
                    .unwrap_or_default();
                let annotation = child
                    .child_by_field_name("type")
                    .map(|t| text(t, src).to_string());
                out.push(Param {
                    name,
                    annotation,
                    has_default: true,
                });
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                out.push(Param {
                    name: text(child, src).trim_start_matches('*').to_string(),
                    annotation: None,
                    has_default: false,
                });
            }
            _ => {}
        }
    }
    out
}

fn collect_global_decls(node: Node, src: &[u8], out: &mut FxHashSet<String>) {
    if node.kind() == "function_definition" {
        return;
    }
    if node.kind() == "global_statement" {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "identifier" {
                out.insert(text(child, src).to_string());
            }
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_global_decls(child, src, out);
    }
}

struct BodyAcc<'a> {
    module_id: &'a str,
    scope: &'a str,
    module_names: &'a FxHashSet<String>,
    global_decls: FxHashSet<String>,
    calls: Vec<CallSite>,
    globals: Vec<GlobalAccess>,
    aliases: Vec<LocalAlias>,
    loops: Vec<LoopSpan>,
    returns: Vec<ReturnSite>,
    nested: Vec<FunctionDef>,
    exceptions: ExceptionSummary,
}

fn walk_body(node: Node, src: &[u8], acc: &mut BodyAcc, in_except: bool) {
    match node.kind() {
        "function_definition" => {
            // Nested function: its body belongs to the nested def, not us.
            let nested = extract_function(
                node,
                src,
                acc.module_id,
                None,
                Vec::new(),
                acc.module_names,
            );
            let renamed = FunctionDef {
                qualified_name: format!("{}.{}", acc.scope, nested.name),
                ..nested
            };
            acc.nested.push(renamed);
            return;
        }
        "decorated_definition" => {
            if let Some(def) = node.child_by_field_name("definition") {
                if def.kind() == "function_definition" {
                    let decorators = extract_decorators(node, src);
                    let nested = extract_function(
                        def,
                        src,
                        acc.module_id,
                        None,
                        decorators,
                        acc.module_names,
                    );
                    let renamed = FunctionDef {
                        qualified_name: format!("{}.{}", acc.scope, nested.name),
                        ..nested
                    };
                    acc.nested.push(renamed);
                }
            }
            return;
        }
        "call" => {
            extract_call(node, src, acc);
            // Descend into arguments: nested calls and identifier reads.
            if let Some(args) = node.child_by_field_name("arguments") {
                let mut cursor = args.walk();
                for child in args.named_children(&mut cursor) {
                    walk_body(child, src, acc, in_except);
                }
            }
            return;
        }
        "for_statement" | "while_statement" => {
            acc.loops.push(LoopSpan {
                line: line(node),
                end_line: end_line(node),
            });
        }
        "return_statement" => {
            let kind = match node.named_child(0) {
                None => ReturnKind::Bare,
                Some(expr) if expr.kind() == "none" => ReturnKind::NullLiteral,
                Some(_) => ReturnKind::Value,
            };
            acc.returns.push(ReturnSite {
                line: line(node),
                kind,
            });
        }
        "raise_statement" => {
            if in_except && node.named_child_count() == 0 {
                acc.exceptions.reraises = true;
            }
        }
        "try_statement" => {
            acc.exceptions.has_try = true;
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "except_clause" {
                    classify_except_clause(child, &mut acc.exceptions);
                    walk_children(child, src, acc, true);
                } else {
                    walk_children(child, src, acc, in_except);
                }
            }
            return;
        }
        "assignment" | "augmented_assignment" => {
            let left = node.child_by_field_name("left");
            let right = node.child_by_field_name("right");
            if let Some(left) = left {
                record_write_target(left, src, acc);
                if let (Some(right), "identifier") = (right, left.kind()) {
                    if right.kind() == "identifier" {
                        acc.aliases.push(LocalAlias {
                            target: text(left, src).to_string(),
                            source: text(right, src).to_string(),
                            line: line(node),
                        });
                    }
                }
            }
            if let Some(right) = right {
                walk_body(right, src, acc, in_except);
            }
            return;
        }
        "identifier" => {
            let name = text(node, src);
            if acc.module_names.contains(name) {
                acc.globals.push(GlobalAccess {
                    name: name.to_string(),
                    line: line(node),
                    write: false,
                });
            }
            return;
        }
        _ => {}
    }

    walk_children(node, src, acc, in_except);
}

fn walk_children(node: Node, src: &[u8], acc: &mut BodyAcc, in_except: bool) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        walk_body(child, src, acc, in_except);
    }
}

/// Bare `except:` has a block as its only named child; a typed handler
/// carries the exception expression first.
fn classify_except_clause(clause: Node, summary: &mut ExceptionSummary) {
    let mut has_type = false;
    let mut cursor = clause.walk();
    for child in clause.named_children(&mut cursor) {
        if child.kind() != "block" {
            has_type = true;
        }
    }
    if has_type {
        summary.specific_handlers += 1;
    } else {
        summary.bare_handlers += 1;
    }
}

/// Classify an assignment target for shared-state tracking.
///
/// A plain `name = …` only writes module state under a `global` declaration
/// (otherwise it shadows locally); `container[k] = …` and `obj.attr = …`
/// mutate module state whenever the root name is module-level.
fn record_write_target(left: Node, src: &[u8], acc: &mut BodyAcc) {
    match left.kind() {
        "identifier" => {
            let name = text(left, src);
            if acc.module_names.contains(name) && acc.global_decls.contains(name) {
                acc.globals.push(GlobalAccess {
                    name: name.to_string(),
                    line: line(left),
                    write: true,
                });
            }
        }
        "subscript" | "attribute" => {
            if let Some(root) = root_identifier(left, src) {
                if acc.module_names.contains(&root) {
                    acc.globals.push(GlobalAccess {
                        name: root,
                        line: line(left),
                        write: true,
                    });
                }
            }
        }
        "pattern_list" | "tuple_pattern" => {
            let mut cursor = left.walk();
            for child in left.named_children(&mut cursor) {
                record_write_target(child, src, acc);
            }
        }
        _ => {}
    }
}

fn extract_call(node: Node, src: &[u8], acc: &mut BodyAcc) {
    let Some(func) = node.child_by_field_name("function") else {
        return;
    };
    let (callee, receiver) = match func.kind() {
        "identifier" => (text(func, src).to_string(), None),
        "attribute" => {
            let callee = text(func, src).to_string();
            let receiver = root_identifier(func, src);
            (callee, receiver)
        }
        _ => (truncate(text(func, src)), None),
    };

    // A mutating method on a module-level container is a shared-state write.
    if let Some(ref recv) = receiver {
        if acc.module_names.contains(recv) {
            let method = callee.rsplit('.').next().unwrap_or("");
            if MUTATING_METHODS.contains(&method) {
                acc.globals.push(GlobalAccess {
                    name: recv.clone(),
                    line: line(node),
                    write: true,
                });
            }
        }
    }

    let args = node
        .child_by_field_name("arguments")
        .map(|a| extract_args(a, src))
        .unwrap_or_default();

    acc.calls.push(CallSite {
        callee,
        receiver,
        awaited: is_awaited(node),
        line: line(node),
        args,
        discarded: is_discarded(node),
    });
}

fn extract_args(arguments: Node, src: &[u8]) -> Vec<CallArg> {
    let mut out = Vec::new();
    let mut cursor = arguments.walk();
    for child in arguments.named_children(&mut cursor) {
        let value = if child.kind() == "keyword_argument" {
            child.child_by_field_name("value").unwrap_or(child)
        } else {
            child
        };
        let mut names = SmallVec::new();
        collect_identifiers(value, src, &mut names);
        out.push(CallArg {
            text: truncate(text(value, src)),
            is_string_literal: matches!(value.kind(), "string" | "concatenated_string"),
            is_number_literal: matches!(value.kind(), "integer" | "float"),
            names,
        });
    }
    out
}

fn collect_identifiers(node: Node, src: &[u8], out: &mut SmallVec<[String; 2]>) {
    if out.len() >= 8 {
        return;
    }
    if node.kind() == "identifier" {
        let name = text(node, src).to_string();
        if !out.contains(&name) {
            out.push(name);
        }
        return;
    }
    // For attributes, only the root object is a variable reference.
    if node.kind() == "attribute" {
        if let Some(obj) = node.child_by_field_name("object") {
            collect_identifiers(obj, src, out);
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_identifiers(child, src, out);
    }
}

fn is_awaited(call: Node) -> bool {
    let mut current = call.parent();
    while let Some(node) = current {
        match node.kind() {
            "await" => return true,
            "parenthesized_expression" => current = node.parent(),
            _ => return false,
        }
    }
    false
}

fn is_discarded(call: Node) -> bool {
    let mut current = call.parent();
    while let Some(node) = current {
        match node.kind() {
            "await" | "parenthesized_expression" => current = node.parent(),
            "expression_statement" => return true,
            _ => return false,
        }
    }
    false
}

fn root_identifier(node: Node, src: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" => Some(text(node, src).to_string()),
        "attribute" | "subscript" => node
            .child_by_field_name("object")
            .or_else(|| node.child_by_field_name("value"))
            .and_then(|obj| root_identifier(obj, src)),
        _ => None,
    }
}

fn last_named_child(node: Node) -> Option<Node> {
    let count = node.named_child_count();
    if count == 0 {
        None
    } else {
        node.named_child(count - 1)
    }
}

fn text<'a>(node: Node, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

fn truncate(s: &str) -> String {
    if s.len() <= MAX_ARG_TEXT {
        s.to_string()
    } else {
        let mut end = MAX_ARG_TEXT;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s[..end].to_string()
    }
}

fn line(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

fn end_line(node: Node) -> u32 {
    node.end_position().row as u32 + 1
}
