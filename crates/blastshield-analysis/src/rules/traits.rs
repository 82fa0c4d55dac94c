//! Rule trait and evaluation context.

use blastshield_core::types::ast::ModuleAST;
use blastshield_core::types::violation::{RuleId, RuleViolation, Severity};
use blastshield_core::EngineConfig;

use crate::call_graph::CallGraph;
use crate::flow::FlowIndex;

/// Whether a rule reads only one file's facts (cacheable per file) or the
/// whole scan's graph (recomputed every scan).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    File,
    Graph,
}

/// Deterministic allow-lists and bounds the rules consult.
#[derive(Debug, Clone)]
pub struct RuleConfig {
    pub sleep_equivalents: Vec<String>,
    pub blocking_sinks: Vec<String>,
    pub max_graph_depth: usize,
}

impl RuleConfig {
    pub fn from_engine_config(config: &EngineConfig) -> Self {
        Self {
            sleep_equivalents: config.effective_sleep_equivalents(),
            blocking_sinks: config.effective_blocking_sinks(),
            max_graph_depth: config.effective_max_graph_depth(),
        }
    }
}

/// Context passed to every rule. File-scoped rules receive a single-module
/// slice; graph-scoped rules receive the full scan.
pub struct RuleContext<'a> {
    pub modules: &'a [ModuleAST],
    pub graph: &'a CallGraph,
    pub flow: &'a FlowIndex,
    pub config: &'a RuleConfig,
}

pub trait Rule: Send + Sync {
    fn id(&self) -> RuleId;
    fn severity(&self) -> Severity;
    fn scope(&self) -> RuleScope;
    fn evaluate(&self, ctx: &RuleContext) -> Vec<RuleViolation>;
}

/// All functions of a module, methods and nested definitions included.
pub fn all_functions_deep(module: &ModuleAST) -> Vec<&blastshield_core::types::ast::FunctionDef> {
    fn push<'a>(
        func: &'a blastshield_core::types::ast::FunctionDef,
        out: &mut Vec<&'a blastshield_core::types::ast::FunctionDef>,
    ) {
        out.push(func);
        for nested in &func.nested {
            push(nested, out);
        }
    }
    let mut out = Vec::new();
    for func in module.all_functions() {
        push(func, &mut out);
    }
    out
}

/// Deterministic emission order: `(registration order, file, line)`.
pub fn sort_violations(violations: &mut [RuleViolation]) {
    violations.sort_by(|a, b| {
        a.rule_id
            .registration_index()
            .cmp(&b.rule_id.registration_index())
            .then_with(|| a.file.cmp(&b.file))
            .then_with(|| a.line.cmp(&b.line))
            .then_with(|| a.end_line.cmp(&b.end_line))
    });
}
