//! RuleRegistry — fixed registration order, panic isolation.
//!
//! A rule that panics is caught; the engine records a `rule_error`
//! low-severity violation against the affected file and continues.

use std::panic::{catch_unwind, AssertUnwindSafe};

use blastshield_core::types::violation::{GraphNodeRef, RuleId, RuleViolation, Severity};

use super::traits::{Rule, RuleContext, RuleScope};

pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn register(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    /// The eight rules in their fixed registration order.
    pub fn with_default_rules() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(super::race_condition::RaceConditionRule));
        registry.register(Box::new(super::missing_await::MissingAwaitRule));
        registry.register(Box::new(super::dangerous_eval::DangerousEvalRule));
        registry.register(Box::new(super::unsanitized_io::UnsanitizedIoRule));
        registry.register(Box::new(super::shared_state::SharedMutableStateRule));
        registry.register(Box::new(
            super::exception_boundary::MissingExceptionBoundaryRule,
        ));
        registry.register(Box::new(super::retry_backoff::RetryWithoutBackoffRule));
        registry.register(Box::new(super::blocking_io::BlockingIoInAsyncRule));
        registry
    }

    pub fn count(&self) -> usize {
        self.rules.len()
    }

    /// Run file-scoped rules over a single-module context.
    pub fn run_file_scoped(&self, ctx: &RuleContext) -> Vec<RuleViolation> {
        self.run_scope(ctx, RuleScope::File)
    }

    /// Run graph-scoped rules over the full-scan context.
    pub fn run_graph_scoped(&self, ctx: &RuleContext) -> Vec<RuleViolation> {
        self.run_scope(ctx, RuleScope::Graph)
    }

    fn run_scope(&self, ctx: &RuleContext, scope: RuleScope) -> Vec<RuleViolation> {
        let mut violations = Vec::new();
        for rule in &self.rules {
            if rule.scope() != scope {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| rule.evaluate(ctx))) {
                Ok(found) => violations.extend(found),
                Err(_) => {
                    tracing::error!(rule_id = rule.id().name(), "rule panicked during evaluation");
                    if let Some(file) = ctx.modules.first().map(|m| m.path.clone()) {
                        violations.push(rule_error_violation(rule.id(), file));
                    }
                }
            }
        }
        violations
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

fn rule_error_violation(failed: RuleId, file: String) -> RuleViolation {
    RuleViolation {
        rule_id: RuleId::RuleError,
        severity: Severity::Low,
        file: file.clone(),
        line: 1,
        end_line: 1,
        title: "Rule evaluation failed".to_string(),
        description: format!("Rule `{failed}` failed internally while analysing `{file}`."),
        evidence: vec![format!("rule `{failed}` raised during evaluation")],
        affected_function: String::new(),
        graph_node: GraphNodeRef::Unresolved,
    }
}
