//! `missing_exception_boundary` — an entry point with no top-level
//! `try/except`, or with bare handlers that swallow everything.

use blastshield_core::types::violation::{GraphNodeRef, RuleId, RuleViolation, Severity};

use crate::call_graph::builder::is_entry_point_function;

use super::traits::{Rule, RuleContext, RuleScope};

pub struct MissingExceptionBoundaryRule;

impl Rule for MissingExceptionBoundaryRule {
    fn id(&self) -> RuleId {
        RuleId::MissingExceptionBoundary
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn scope(&self) -> RuleScope {
        RuleScope::File
    }

    fn evaluate(&self, ctx: &RuleContext) -> Vec<RuleViolation> {
        let mut violations = Vec::new();

        for module in ctx.modules {
            for func in module.all_functions() {
                if !is_entry_point_function(func) {
                    continue;
                }
                let summary = &func.exceptions;

                let evidence = if !summary.has_top_level_try {
                    vec![
                        format!("`{}` is an entry point", func.qualified_name),
                        "its top-level body has no try/except".to_string(),
                    ]
                } else if summary.bare_handlers > 0
                    && summary.specific_handlers == 0
                    && !summary.reraises
                {
                    vec![
                        format!("`{}` is an entry point", func.qualified_name),
                        format!(
                            "all {} handler(s) are bare `except` and re-raise nothing",
                            summary.bare_handlers
                        ),
                    ]
                } else {
                    continue;
                };

                violations.push(RuleViolation {
                    rule_id: RuleId::MissingExceptionBoundary,
                    severity: Severity::Medium,
                    file: module.path.clone(),
                    line: func.line,
                    end_line: func.line,
                    title: format!("Entry point `{}` lacks an error boundary", func.name),
                    description: format!(
                        "Failures inside `{}` propagate to the framework unhandled, \
                         turning recoverable errors into request failures.",
                        func.name
                    ),
                    evidence,
                    affected_function: func.qualified_name.clone(),
                    graph_node: GraphNodeRef::resolved(func.qualified_name.clone()),
                });
            }
        }

        violations
    }
}
