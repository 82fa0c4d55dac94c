//! `blocking_io_in_async` — a known blocking call inside an async
//! function stalls the event loop for every other task.

use blastshield_core::types::violation::{GraphNodeRef, RuleId, RuleViolation, Severity};

use crate::flow::analyzer::{canonical_callee, import_aliases};

use super::traits::{all_functions_deep, Rule, RuleContext, RuleScope};

pub struct BlockingIoInAsyncRule;

impl Rule for BlockingIoInAsyncRule {
    fn id(&self) -> RuleId {
        RuleId::BlockingIoInAsync
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn scope(&self) -> RuleScope {
        RuleScope::File
    }

    fn evaluate(&self, ctx: &RuleContext) -> Vec<RuleViolation> {
        let mut violations = Vec::new();

        for module in ctx.modules {
            let aliases = import_aliases(&module.imports);
            for func in all_functions_deep(module) {
                if !func.is_async {
                    continue;
                }
                for call in &func.call_sites {
                    let callee = canonical_callee(&call.callee, &aliases);
                    if !ctx.config.blocking_sinks.contains(&callee) {
                        continue;
                    }

                    violations.push(RuleViolation {
                        rule_id: RuleId::BlockingIoInAsync,
                        severity: Severity::High,
                        file: module.path.clone(),
                        line: call.line,
                        end_line: call.line,
                        title: format!("Blocking call `{callee}` in async function"),
                        description: format!(
                            "`{}` is async but calls blocking `{callee}`, which stalls \
                             the event loop for every concurrent task.",
                            func.name
                        ),
                        evidence: vec![
                            format!("`{}` is declared async", func.qualified_name),
                            format!("`{callee}` blocks at line {}", call.line),
                        ],
                        affected_function: func.qualified_name.clone(),
                        graph_node: GraphNodeRef::resolved(func.qualified_name.clone()),
                    });
                }
            }
        }

        violations
    }
}
