//! `dangerous_eval` — `eval`/`exec` over anything that is not a literal
//! string, or that flows from a function parameter.

use blastshield_core::types::violation::{GraphNodeRef, RuleId, RuleViolation, Severity};
use blastshield_core::FxHashSet;

use crate::flow::analyzer::{canonical_callee, import_aliases};

use super::traits::{all_functions_deep, Rule, RuleContext, RuleScope};

pub struct DangerousEvalRule;

impl Rule for DangerousEvalRule {
    fn id(&self) -> RuleId {
        RuleId::DangerousEval
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn scope(&self) -> RuleScope {
        RuleScope::File
    }

    fn evaluate(&self, ctx: &RuleContext) -> Vec<RuleViolation> {
        let mut violations = Vec::new();

        for module in ctx.modules {
            let aliases = import_aliases(&module.imports);
            for func in all_functions_deep(module) {
                let params: FxHashSet<&str> =
                    func.params.iter().map(|p| p.name.as_str()).collect();

                for call in &func.call_sites {
                    let callee = canonical_callee(&call.callee, &aliases);
                    if callee != "eval" && callee != "exec" {
                        continue;
                    }
                    let Some(arg) = call.args.first() else {
                        continue;
                    };
                    if arg.is_literal() && arg.is_string_literal {
                        continue;
                    }

                    let mut evidence = vec![format!("call to `{callee}` at line {}", call.line)];
                    let from_param = arg.names.iter().find(|n| params.contains(n.as_str()));
                    match from_param {
                        Some(param) => evidence
                            .push(format!("argument flows from function parameter `{param}`")),
                        None => evidence
                            .push(format!("argument `{}` is not a string literal", arg.text)),
                    }

                    violations.push(RuleViolation {
                        rule_id: RuleId::DangerousEval,
                        severity: Severity::Critical,
                        file: module.path.clone(),
                        line: call.line,
                        end_line: call.line,
                        title: format!("Dynamic code execution via `{callee}`"),
                        description: format!(
                            "`{}` passes non-literal input to `{callee}`, allowing \
                             arbitrary code execution.",
                            func.name
                        ),
                        evidence,
                        affected_function: func.qualified_name.clone(),
                        graph_node: GraphNodeRef::resolved(func.qualified_name.clone()),
                    });
                }
            }
        }

        violations
    }
}
