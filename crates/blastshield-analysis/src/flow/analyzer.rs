//! Per-function flow analysis: nullable returns, tainted parameter flow,
//! shared-container mutation. Path-insensitive by design; a fact states
//! that a flow exists on some path, not on all paths.

use blastshield_core::types::ast::{FunctionDef, ImportStmt, ModuleAST, ReturnKind};
use blastshield_core::{FxHashMap, FxHashSet};

use super::types::{FlowFacts, FlowIndex, SinkKind, TaintedSink};

/// Built-in sink table: canonical callee → kind.
const SINKS: &[(&str, SinkKind)] = &[
    ("eval", SinkKind::DynamicCode),
    ("exec", SinkKind::DynamicCode),
    ("os.system", SinkKind::Shell),
    ("os.popen", SinkKind::Shell),
    ("subprocess.run", SinkKind::Subprocess),
    ("subprocess.call", SinkKind::Subprocess),
    ("subprocess.check_call", SinkKind::Subprocess),
    ("subprocess.check_output", SinkKind::Subprocess),
    ("subprocess.Popen", SinkKind::Subprocess),
    ("open", SinkKind::Filesystem),
    ("os.remove", SinkKind::Filesystem),
    ("os.unlink", SinkKind::Filesystem),
    ("shutil.rmtree", SinkKind::Filesystem),
];

pub struct FlowAnalyzer {
    sanitizers: Vec<String>,
}

impl FlowAnalyzer {
    pub fn new(sanitizers: Vec<String>) -> Self {
        Self { sanitizers }
    }

    /// Analyse every function of every module.
    pub fn analyze(&self, modules: &[ModuleAST]) -> FlowIndex {
        let mut index = FlowIndex::default();
        for module in modules {
            let aliases = import_aliases(&module.imports);
            for func in module.all_functions() {
                self.analyze_function(func, &aliases, &mut index);
                for nested in &func.nested {
                    self.analyze_function(nested, &aliases, &mut index);
                }
            }
        }
        index
    }

    fn analyze_function(
        &self,
        func: &FunctionDef,
        import_aliases: &FxHashMap<String, String>,
        index: &mut FlowIndex,
    ) {
        let facts = FlowFacts {
            nullable_return: nullable_return(func),
            tainted_sinks: self.tainted_sinks(func, import_aliases),
            mutated_shared: mutated_shared(func),
        };
        index.insert(func.qualified_name.clone(), facts);
    }

    fn tainted_sinks(
        &self,
        func: &FunctionDef,
        import_aliases: &FxHashMap<String, String>,
    ) -> Vec<TaintedSink> {
        let params: FxHashSet<&str> = func
            .params
            .iter()
            .map(|p| p.name.as_str())
            .filter(|name| *name != "self" && *name != "cls")
            .collect();
        if params.is_empty() {
            return Vec::new();
        }

        // tainted name → originating parameter
        let mut tainted: FxHashMap<String, String> = params
            .iter()
            .map(|p| (p.to_string(), p.to_string()))
            .collect();
        for alias in &func.local_aliases {
            if let Some(origin) = tainted.get(&alias.source).cloned() {
                tainted.insert(alias.target.clone(), origin);
            }
        }

        // Any sanitiser call over a tainted name neutralises that name.
        let mut sanitized: FxHashSet<String> = FxHashSet::default();
        for call in &func.call_sites {
            let callee = canonical_callee(&call.callee, import_aliases);
            if self
                .sanitizers
                .iter()
                .any(|s| s == &callee || s == &call.callee)
            {
                for arg in &call.args {
                    for name in &arg.names {
                        if tainted.contains_key(name.as_str()) {
                            sanitized.insert(name.clone());
                        }
                    }
                }
            }
        }

        let mut sinks = Vec::new();
        for call in &func.call_sites {
            let callee = canonical_callee(&call.callee, import_aliases);
            let Some(kind) = sink_kind(&callee) else {
                continue;
            };
            for arg in &call.args {
                let Some(name) = arg
                    .names
                    .iter()
                    .find(|n| tainted.contains_key(n.as_str()) && !sanitized.contains(n.as_str()))
                else {
                    continue;
                };
                let parameter = tainted[name.as_str()].clone();
                let via_alias = (&parameter != name).then(|| name.clone());
                sinks.push(TaintedSink {
                    parameter,
                    via_alias,
                    sink: callee.clone(),
                    kind,
                    line: call.line,
                });
                break;
            }
        }
        sinks.sort_by_key(|s| s.line);
        sinks
    }
}

/// Non-optional annotation with a null, bare, or fall-through return path.
fn nullable_return(func: &FunctionDef) -> bool {
    let Some(annotation) = func.return_annotation.as_deref() else {
        return false;
    };
    // String annotations (`-> "Optional[str]"`) arrive quoted.
    let annotation = annotation.trim().trim_matches(&['"', '\''][..]).trim();
    if annotation == "None"
        || annotation.starts_with("Optional")
        || annotation.contains("| None")
        || annotation.contains("None |")
    {
        return false;
    }
    func.returns
        .iter()
        .any(|r| matches!(r.kind, ReturnKind::Bare | ReturnKind::NullLiteral))
        || func.falls_through
}

fn mutated_shared(func: &FunctionDef) -> Vec<String> {
    let mut names: Vec<String> = func
        .global_accesses
        .iter()
        .filter(|a| a.write)
        .map(|a| a.name.clone())
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Local import bindings: `from os import system` lets a bare `system(x)`
/// reach `os.system`; `import subprocess as sp` makes `sp.run` canonical
/// `subprocess.run`.
pub fn import_aliases(imports: &[ImportStmt]) -> FxHashMap<String, String> {
    let mut aliases = FxHashMap::default();
    for import in imports {
        if import.is_from {
            for name in &import.names {
                if name.name == "*" {
                    continue;
                }
                aliases.insert(
                    name.local_name().to_string(),
                    format!("{}.{}", import.module, name.name),
                );
            }
        } else if let Some(name) = import.names.first() {
            if let Some(alias) = &name.alias {
                aliases.insert(alias.clone(), import.module.clone());
            }
        }
    }
    aliases
}

/// Rewrite a callee as written into its canonical dotted form.
pub fn canonical_callee(callee: &str, import_aliases: &FxHashMap<String, String>) -> String {
    if let Some((prefix, rest)) = callee.split_once('.') {
        if let Some(module) = import_aliases.get(prefix) {
            return format!("{module}.{rest}");
        }
        return callee.to_string();
    }
    import_aliases
        .get(callee)
        .cloned()
        .unwrap_or_else(|| callee.to_string())
}

pub fn sink_kind(canonical: &str) -> Option<SinkKind> {
    if let Some((_, kind)) = SINKS.iter().find(|(name, _)| *name == canonical) {
        return Some(*kind);
    }
    // Raw SQL: any `…execute(…)`/`…executemany(…)` method call.
    let last = canonical.rsplit('.').next().unwrap_or(canonical);
    if matches!(last, "execute" | "executemany") && canonical.contains('.') {
        return Some(SinkKind::Sql);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_from_imports_and_module_aliases() {
        let mut aliases = FxHashMap::default();
        aliases.insert("system".to_string(), "os.system".to_string());
        aliases.insert("sp".to_string(), "subprocess".to_string());
        assert_eq!(canonical_callee("system", &aliases), "os.system");
        assert_eq!(canonical_callee("sp.run", &aliases), "subprocess.run");
        assert_eq!(canonical_callee("eval", &aliases), "eval");
    }

    #[test]
    fn execute_is_a_sql_sink_only_as_a_method() {
        assert_eq!(sink_kind("cursor.execute"), Some(SinkKind::Sql));
        assert_eq!(sink_kind("execute"), None);
        assert_eq!(sink_kind("os.system"), Some(SinkKind::Shell));
    }
}
